// Resolve the commit hash before the build and expose
// `BUILD_VERSION` (crate version + short commit) to the crate.

use std::process::Command;

fn main() {
    let commit_hash = match option_env!("FORGE_COMMIT_HASH") {
        Some(hash) => hash.chars().take(7).collect::<String>(),
        None => match Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
        {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            // Not a git checkout (or git missing)
            _ => "unknown".to_string(),
        },
    };

    let build_version = format!("{}-{}", env!("CARGO_PKG_VERSION"), commit_hash);
    println!("cargo:rerun-if-env-changed=FORGE_COMMIT_HASH");
    println!("cargo:rustc-env=BUILD_VERSION={build_version}");
}
