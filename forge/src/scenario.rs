//! Scripted scenarios, as run by the `forge-sim` binary.
//!
//! A scenario is a JSON document listing steps. Each step names the calling
//! account and one forge operation. Any string of the form `"@name"` is an
//! account reference: it resolves to the address a previous step bound to
//! `name`, or else to the stable address of the label `name`.
//!
//! ```json
//! {
//!   "admin": "@admin",
//!   "steps": [
//!     { "as": "@admin", "op": "create_asset_factory", "kind": "fungible", "bind": "erc20" },
//!     { "as": "@alice", "op": "deploy", "factory": "@erc20", "bind": "token",
//!       "params": { "kind": "fungible", "name": "Token", "symbol": "TKN", "decimals": 18,
//!                   "initial_supply": 1000, "owner": "@alice" } }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use log::{error, info};
use serde::Deserialize;
use serde_json::Value;
use strum::IntoStaticStr;
use thiserror::Error;

use forge_common::{
    asset::{AssetKind, AssetParams},
    capability::{CapabilityParams, CapabilityType},
    crypto::{Address, Hash},
    domain::{BeaconTarget, FactoryDomain},
    error::{ForgeError, ForgeResult},
    time::{get_current_time_in_seconds, BlockHeight, TimestampSeconds},
};

use crate::{config::ForgeConfig, context::ExecutionContext, ledger::EventRecord, Forge};

const LABEL_PREFIX: char = '@';

fn default_admin() -> String {
    "@admin".to_string()
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("forge genesis failed: {0}")]
    Genesis(#[source] ForgeError),
    #[error("malformed step {index}: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("step {index} ({op}) failed: {source}")]
    StepFailed {
        index: usize,
        op: &'static str,
        #[source]
        source: ForgeError,
    },
    #[error("step {index} ({op}) succeeded but was expected to fail")]
    UnexpectedSuccess { index: usize, op: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_admin")]
    pub admin: String,
    /// Timestamp of the first step (default: now)
    #[serde(default)]
    pub start_time: Option<TimestampSeconds>,
    /// Kept raw until executed: references resolve against earlier binds
    pub steps: Vec<Value>,
}

impl Scenario {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(rename = "as")]
    caller: Address,
    /// Name the address this step produced
    #[serde(default)]
    bind: Option<String>,
    #[serde(default)]
    expect_failure: bool,
    #[serde(flatten)]
    action: Action,
}

#[derive(Debug, Deserialize, IntoStaticStr)]
#[serde(tag = "op", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
enum Action {
    CreateAssetFactory {
        kind: AssetKind,
        #[serde(default)]
        bytecode: Option<String>,
    },
    CreateExtensionFactory {
        kind: AssetKind,
    },
    InitializeAssetBeacon {
        factory: Address,
    },
    InitializeBeacons {
        factory: Address,
        types: Vec<CapabilityType>,
    },
    DeployImplementation {
        target: BeaconTarget,
        #[serde(default)]
        bytecode: Option<String>,
    },
    GrantRegistrar {
        account: Address,
    },
    RevokeRegistrar {
        account: Address,
    },
    RegisterFactory {
        factory: Address,
        domain: FactoryDomain,
        version: String,
        #[serde(default)]
        description: String,
    },
    DeprecateFactory {
        factory: Address,
    },
    ActivateFactory {
        factory: Address,
    },
    SetLatestFactory {
        domain: FactoryDomain,
        factory: Address,
    },
    Deploy {
        factory: Address,
        params: AssetParams,
    },
    DeployDeterministic {
        factory: Address,
        salt: u64,
        params: AssetParams,
    },
    DeployBeacon {
        factory: Address,
        params: AssetParams,
    },
    PredictAddress {
        factory: Address,
        salt: u64,
    },
    AttachCapability {
        factory: Address,
        asset: Address,
        capability_type: CapabilityType,
        #[serde(default)]
        params: Value,
    },
    DeployCapability {
        factory: Address,
        asset: Address,
        capability_type: CapabilityType,
        #[serde(default)]
        params: Value,
    },
    DeactivateCapability {
        capability: Address,
    },
    ReactivateCapability {
        capability: Address,
    },
    SetCompatibility {
        kind: AssetKind,
        capability_type: CapabilityType,
        compatible: bool,
    },
    UpgradeBeacon {
        factory: Address,
        capability_type: CapabilityType,
        implementation: Address,
    },
    UpgradeAssetBeacon {
        factory: Address,
        implementation: Address,
    },
    ProposeUpgrade {
        factory: Address,
        target: BeaconTarget,
        implementation: Address,
    },
}

/// Totals of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub steps: usize,
    pub failed: usize,
    pub events: usize,
}

pub struct ScenarioRunner {
    forge: Forge,
    symbols: HashMap<String, Address>,
    timestamp: TimestampSeconds,
    block_height: BlockHeight,
    continue_on_error: bool,
}

impl ScenarioRunner {
    pub fn new(config: ForgeConfig, scenario: &Scenario) -> Result<Self, ScenarioError> {
        let symbols = HashMap::new();
        let admin = resolve_label(&symbols, &scenario.admin);
        let forge = Forge::new(admin, config).map_err(ScenarioError::Genesis)?;
        Ok(Self {
            forge,
            symbols,
            timestamp: scenario
                .start_time
                .unwrap_or_else(get_current_time_in_seconds),
            block_height: 0,
            continue_on_error: false,
        })
    }

    /// Log failed steps and keep going instead of aborting the run
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    pub fn forge(&self) -> &Forge {
        &self.forge
    }

    /// Address a label currently resolves to
    pub fn resolve(&self, label: &str) -> Address {
        resolve_label(&self.symbols, label)
    }

    /// Execute every step, handing each emitted event to `sink`
    pub fn run(
        &mut self,
        scenario: &Scenario,
        mut sink: impl FnMut(&EventRecord),
    ) -> Result<RunReport, ScenarioError> {
        let mut report = RunReport::default();
        for (index, raw) in scenario.steps.iter().enumerate() {
            let step: Step = serde_json::from_value(resolve_references(&self.symbols, raw))
                .map_err(|source| ScenarioError::Malformed { index, source })?;
            let op: &'static str = (&step.action).into();

            self.block_height += 1;
            let ctx = ExecutionContext::new(step.caller, self.timestamp, self.block_height);
            self.timestamp += 1;

            let first_event = self.forge.events().len();
            let result = self.execute(&ctx, step.action);
            report.steps += 1;

            match (result, step.expect_failure) {
                (Ok(produced), false) => {
                    if let (Some(name), Some(address)) = (step.bind, produced) {
                        info!("step {}: @{} = {}", index, name, address);
                        self.symbols.insert(name, address);
                    }
                }
                (Err(e), true) => {
                    info!("step {} ({}) failed as expected: {}", index, op, e);
                }
                (Ok(_), true) => {
                    error!("step {} ({}) succeeded but was expected to fail", index, op);
                    if !self.continue_on_error {
                        return Err(ScenarioError::UnexpectedSuccess { index, op });
                    }
                    report.failed += 1;
                }
                (Err(e), false) => {
                    error!("step {} ({}) failed: {} [code {:#06x}]", index, op, e, e.code());
                    if !self.continue_on_error {
                        return Err(ScenarioError::StepFailed {
                            index,
                            op,
                            source: e,
                        });
                    }
                    report.failed += 1;
                }
            }

            for record in self.forge.ledger().events_since(first_event) {
                sink(record);
                report.events += 1;
            }
        }
        Ok(report)
    }

    fn execute(&mut self, ctx: &ExecutionContext, action: Action) -> ForgeResult<Option<Address>> {
        let forge = &mut self.forge;
        let produced = match action {
            Action::CreateAssetFactory { kind, bytecode } => {
                let bytecode = bytecode.unwrap_or_else(|| format!("{kind}-master-v1"));
                Some(forge.create_asset_factory(ctx, kind, bytecode.into_bytes())?)
            }
            Action::CreateExtensionFactory { kind } => {
                Some(forge.create_extension_factory(ctx, kind)?)
            }
            Action::InitializeAssetBeacon { factory } => {
                Some(forge.initialize_asset_beacon(ctx, &factory)?)
            }
            Action::InitializeBeacons { factory, types } => {
                let modules = types
                    .into_iter()
                    .map(|ty| (ty, format!("{ty}-module-v1").into_bytes()))
                    .collect();
                forge.initialize_beacons(ctx, &factory, modules)?;
                None
            }
            Action::DeployImplementation { target, bytecode } => {
                let bytecode = bytecode.unwrap_or_else(|| format!("{target}-implementation"));
                Some(forge.deploy_implementation(ctx, target, bytecode.into_bytes())?)
            }
            Action::GrantRegistrar { account } => {
                forge.grant_registrar(ctx, account)?;
                None
            }
            Action::RevokeRegistrar { account } => {
                forge.revoke_registrar(ctx, account)?;
                None
            }
            Action::RegisterFactory {
                factory,
                domain,
                version,
                description,
            } => {
                forge.register_factory(ctx, factory, domain, &version, &description)?;
                None
            }
            Action::DeprecateFactory { factory } => {
                forge.deprecate_factory(ctx, &factory)?;
                None
            }
            Action::ActivateFactory { factory } => {
                forge.activate_factory(ctx, &factory)?;
                None
            }
            Action::SetLatestFactory { domain, factory } => {
                forge.set_latest_factory(ctx, domain, &factory)?;
                None
            }
            Action::Deploy { factory, params } => Some(forge.deploy(ctx, &factory, &params)?),
            Action::DeployDeterministic {
                factory,
                salt,
                params,
            } => Some(forge.deploy_deterministic(ctx, &factory, Hash::from_u64(salt), &params)?),
            Action::DeployBeacon { factory, params } => {
                Some(forge.deploy_beacon(ctx, &factory, &params)?)
            }
            Action::PredictAddress { factory, salt } => {
                Some(forge.predict_address(&factory, &Hash::from_u64(salt))?)
            }
            Action::AttachCapability {
                factory,
                asset,
                capability_type,
                params,
            } => Some(forge.attach_capability(
                ctx,
                &factory,
                &asset,
                capability_type,
                &CapabilityParams::new(params),
            )?),
            Action::DeployCapability {
                factory,
                asset,
                capability_type,
                params,
            } => Some(forge.deploy_capability(
                ctx,
                &factory,
                &asset,
                capability_type,
                &CapabilityParams::new(params),
            )?),
            Action::DeactivateCapability { capability } => {
                forge.deactivate_capability(ctx, &capability)?;
                None
            }
            Action::ReactivateCapability { capability } => {
                forge.reactivate_capability(ctx, &capability)?;
                None
            }
            Action::SetCompatibility {
                kind,
                capability_type,
                compatible,
            } => {
                forge.set_compatibility(ctx, kind, capability_type, compatible)?;
                None
            }
            Action::UpgradeBeacon {
                factory,
                capability_type,
                implementation,
            } => Some(forge.upgrade_beacon(ctx, &factory, capability_type, implementation)?),
            Action::UpgradeAssetBeacon {
                factory,
                implementation,
            } => Some(forge.upgrade_asset_beacon(ctx, &factory, implementation)?),
            Action::ProposeUpgrade {
                factory,
                target,
                implementation,
            } => Some(forge.propose_upgrade(ctx, &factory, target, implementation)?),
        };
        Ok(produced)
    }
}

fn resolve_label(symbols: &HashMap<String, Address>, label: &str) -> Address {
    let name = label.strip_prefix(LABEL_PREFIX).unwrap_or(label);
    symbols
        .get(name)
        .copied()
        .unwrap_or_else(|| Address::from_label(name))
}

/// Replace every `"@name"` string with the hex address it refers to
fn resolve_references(symbols: &HashMap<String, Address>, value: &Value) -> Value {
    match value {
        Value::String(s) if s.starts_with(LABEL_PREFIX) => {
            Value::String(resolve_label(symbols, s).to_hex())
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_references(symbols, item))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_references(symbols, v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
