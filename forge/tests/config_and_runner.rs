#![allow(clippy::disallowed_methods)]

mod common;

use std::fs;

use common::*;
use forge_common::{
    asset::AssetKind,
    capability::{CapabilityParams, CapabilityType},
    domain::FactoryDomain,
    error::ForgeError,
};
use forge_engine::{
    config::ForgeConfig,
    scenario::{Scenario, ScenarioRunner},
    Forge,
};
use serde_json::json;
use tempdir::TempDir;

#[test]
fn test_config_file_drives_genesis() {
    init_logger();
    let dir = TempDir::new("forge_config").unwrap();
    let path = dir.path().join("forge.json");
    fs::write(
        &path,
        json!({
            "capability_version_tag": "2.1.0",
            "max_page_size": 25,
            "compatibility_overrides": [
                { "kind": "vault", "capability_type": "pausable", "compatible": true },
                { "kind": "fungible", "capability_type": "permit", "compatible": false }
            ],
            "denied_deployers": [addr("mallory").to_hex()]
        })
        .to_string(),
    )
    .unwrap();

    let config = ForgeConfig::load(&path).unwrap();
    let mut forge = Forge::new(addr("admin"), config).unwrap();
    let registry = forge.registry();
    assert!(registry.is_compatible(AssetKind::Vault, CapabilityType::Pausable));
    assert!(!registry.is_compatible(AssetKind::Fungible, CapabilityType::Permit));

    let admin = ctx("admin");
    let factory = forge
        .create_asset_factory(&admin, AssetKind::Fungible, b"erc20".to_vec())
        .unwrap();
    assert!(matches!(
        forge.deploy(&ctx("mallory"), &factory, &fungible(addr("mallory"))),
        Err(ForgeError::PolicyRejected(_))
    ));
    assert!(forge
        .deploy(&ctx("alice"), &factory, &fungible(addr("alice")))
        .is_ok());

    // the overridden pair gets a beacon and can be attached
    let alice = ctx("alice");
    let erc4626 = forge
        .create_asset_factory(&admin, AssetKind::Vault, b"erc4626".to_vec())
        .unwrap();
    let extension = forge
        .create_extension_factory(&admin, AssetKind::Vault)
        .unwrap();
    forge
        .initialize_beacons(
            &admin,
            &extension,
            vec![(CapabilityType::Pausable, b"pausable".to_vec())],
        )
        .unwrap();
    forge
        .register_factory(
            &admin,
            extension,
            FactoryDomain::Extension(AssetKind::Vault),
            "1.0.0",
            "vault extensions",
        )
        .unwrap();
    let asset = forge.deploy(&alice, &erc4626, &vault(addr("alice"))).unwrap();
    let pausable = forge
        .attach_capability(
            &alice,
            &erc4626,
            &asset,
            CapabilityType::Pausable,
            &CapabilityParams::empty(),
        )
        .unwrap();
    assert_eq!(
        forge
            .registry()
            .get_capability_by_type(&asset, CapabilityType::Pausable),
        Some(pausable)
    );
}

#[test]
fn test_config_rejects_bad_page_size() {
    let dir = TempDir::new("forge_config").unwrap();
    let path = dir.path().join("forge.json");
    fs::write(&path, r#"{ "max_page_size": 0 }"#).unwrap();
    assert!(ForgeConfig::load(&path).is_err());
    assert!(ForgeConfig::load(dir.path().join("missing.json")).is_err());
}

#[test]
fn test_scenario_file_end_to_end() {
    init_logger();
    let dir = TempDir::new("forge_scenario").unwrap();
    let path = dir.path().join("scenario.json");
    let token = json!({
        "kind": "fungible",
        "name": "Token",
        "symbol": "TKN",
        "decimals": 6,
        "initial_supply": 500,
        "owner": "@alice"
    });
    fs::write(
        &path,
        json!({
            "start_time": 1_000,
            "steps": [
                { "as": "@admin", "op": "create_asset_factory", "kind": "fungible",
                  "bind": "erc20" },
                { "as": "@admin", "op": "initialize_asset_beacon", "factory": "@erc20" },
                { "as": "@admin", "op": "create_extension_factory", "kind": "fungible",
                  "bind": "ext" },
                { "as": "@admin", "op": "initialize_beacons", "factory": "@ext",
                  "types": ["permit", "votes"] },
                { "as": "@admin", "op": "register_factory", "factory": "@ext", "version": "v1.0.0",
                  "domain": { "domain": "extension", "key": "fungible" } },
                { "as": "@admin", "op": "predict_address", "factory": "@erc20", "salt": 1,
                  "bind": "predicted" },
                { "as": "@alice", "op": "deploy_deterministic", "factory": "@erc20", "salt": 1,
                  "params": token, "bind": "t1" },
                { "as": "@alice", "op": "deploy_deterministic", "factory": "@erc20", "salt": 1,
                  "params": token, "expect_failure": true },
                { "as": "@alice", "op": "attach_capability", "factory": "@erc20", "asset": "@t1",
                  "capability_type": "permit", "bind": "permit" },
                { "as": "@alice", "op": "attach_capability", "factory": "@erc20", "asset": "@t1",
                  "capability_type": "permit", "expect_failure": true },
                { "as": "@dev", "op": "deploy_implementation",
                  "target": { "family": "capability", "key": "permit" }, "bind": "permit_v2" },
                { "as": "@admin", "op": "upgrade_beacon", "factory": "@ext",
                  "capability_type": "permit", "implementation": "@permit_v2" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let scenario = Scenario::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
    let mut runner = ScenarioRunner::new(ForgeConfig::default(), &scenario).unwrap();
    let mut lines = Vec::new();
    let report = runner
        .run(&scenario, |record| {
            lines.push(serde_json::to_string(record).unwrap())
        })
        .unwrap();

    assert_eq!(report.steps, 12);
    assert_eq!(report.failed, 0);
    assert_eq!(lines.len(), report.events);
    assert_eq!(runner.resolve("@t1"), runner.resolve("@predicted"));

    let forge = runner.forge();
    let t1 = runner.resolve("t1");
    let permit = runner.resolve("permit");
    assert_eq!(
        forge.registry().get_capability_by_type(&t1, CapabilityType::Permit),
        Some(permit)
    );
    assert_eq!(forge.implementation_of(&permit), Ok(runner.resolve("permit_v2")));
    assert!(lines.iter().any(|l| l.contains("\"event\":\"beacon_upgraded\"")));
}
