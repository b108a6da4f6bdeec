use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, info, LevelFilter};

use forge_common::config::VERSION;
use forge_engine::{
    config::ForgeConfig,
    scenario::{Scenario, ScenarioRunner},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Run a scripted scenario against an in-process forge and print every
/// emitted event as one JSON line on stdout
#[derive(Debug, Parser)]
#[command(name = "forge-sim", version = VERSION, about)]
struct Args {
    /// Scenario file (JSON)
    scenario: PathBuf,
    /// Forge configuration file (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Set log level
    #[arg(long, value_enum, default_value_t)]
    log_level: LogLevel,
    /// Also write logs to this file, without colors
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Disable the usage of colors in log
    #[arg(long)]
    disable_log_color: bool,
    /// Keep running after a failing step
    #[arg(long)]
    continue_on_error: bool,
}

fn setup_logger(args: &Args) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::BrightBlack);
    let use_colors = !args.disable_log_color;

    // logs go to stderr so stdout stays a clean event stream
    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            let level = if use_colors {
                colors.color(record.level()).to_string()
            } else {
                record.level().to_string()
            };
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                level,
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level(args.log_level.into())
        .chain(console);

    if let Some(path) = &args.log_file {
        let file = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] [{}] [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(
                fern::log_file(path)
                    .with_context(|| format!("opening log file {}", path.display()))?,
            );
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().context("installing logger")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logger(&args)?;
    info!("forge-sim {}", VERSION);

    let config = match &args.config {
        Some(path) => ForgeConfig::load(path)?,
        None => ForgeConfig::default(),
    };

    let content = fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading scenario {}", args.scenario.display()))?;
    let scenario = Scenario::from_json(&content)
        .with_context(|| format!("parsing scenario {}", args.scenario.display()))?;

    let mut runner =
        ScenarioRunner::new(config, &scenario)?.continue_on_error(args.continue_on_error);
    let mut output_error = None;
    let outcome = runner.run(&scenario, |record| match serde_json::to_string(record) {
        Ok(line) => println!("{line}"),
        Err(e) => {
            output_error.get_or_insert(e);
        }
    });
    if let Some(e) = output_error {
        error!("failed to encode an event: {}", e);
    }

    let report = outcome?;
    info!(
        "{} steps, {} failed, {} events",
        report.steps, report.failed, report.events
    );
    let forge = runner.forge();
    info!(
        "{} accounts, {} base assets, {} capabilities ({} active)",
        forge.ledger().account_count(),
        forge.registry().base_asset_count(),
        forge.registry().capability_count(),
        forge.registry().active_capability_count()
    );
    Ok(())
}
