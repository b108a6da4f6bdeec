#![allow(clippy::disallowed_methods)]

mod common;

use std::sync::Arc;

use anyhow::anyhow;
use common::*;
use forge_common::{
    asset::AssetKind,
    capability::{CapabilityParams, CapabilityType},
    domain::BeaconTarget,
    error::ForgeError,
    event::ForgeEvent,
};
use forge_engine::beacon::{CouncilGovernance, UpgradeGovernance, UpgradeProposal};

struct Offline;

impl UpgradeGovernance for Offline {
    fn approve(&self, _proposal: &UpgradeProposal) -> anyhow::Result<bool> {
        Err(anyhow!("governance offline"))
    }
}

#[test]
fn test_asset_beacon_upgrade_moves_every_proxy() {
    let mut fx = Fixture::fungible(&[]);
    let admin = fx.admin;
    let params = fungible(addr("alice"));

    let proxies: Vec<_> = (0..3)
        .map(|_| fx.forge.deploy_beacon(&ctx("alice"), &fx.base, &params).unwrap())
        .collect();
    let clone = fx.deploy_token("bob");
    let master = fx.forge.master_implementation(&fx.base).unwrap();
    for proxy in &proxies {
        assert_eq!(fx.forge.implementation_of(proxy), Ok(master));
    }

    let v2 = fx
        .forge
        .deploy_implementation(
            &admin,
            BeaconTarget::Asset(AssetKind::Fungible),
            b"erc20-v2".to_vec(),
        )
        .unwrap();
    let previous = fx.forge.upgrade_asset_beacon(&admin, &fx.base, v2).unwrap();
    assert_eq!(previous, master);

    for proxy in &proxies {
        assert_eq!(fx.forge.implementation_of(proxy), Ok(v2));
    }
    assert_eq!(fx.forge.implementation_of(&clone), Ok(master));
    assert!(fx.forge.events().iter().any(|r| matches!(
        r.event,
        ForgeEvent::BeaconUpgraded { implementation, .. } if implementation == v2
    )));
}

#[test]
fn test_upgrade_to_codeless_address_fails() {
    let mut fx = Fixture::fungible(&[CapabilityType::Permit]);
    let admin = fx.admin;
    let beacon = fx
        .forge
        .extension_factory(&fx.extension)
        .and_then(|f| f.beacon(CapabilityType::Permit))
        .unwrap();
    let (current, _) = fx.forge.ledger().beacon(&beacon).unwrap();
    let events = fx.forge.events().len();

    let nowhere = addr("nowhere");
    assert_eq!(
        fx.forge
            .upgrade_beacon(&admin, &fx.extension, CapabilityType::Permit, nowhere),
        Err(ForgeError::NoCode(nowhere))
    );
    // an asset instance has code but is not an implementation
    let token = fx.deploy_token("alice");
    let events_after_deploy = fx.forge.events().len();
    assert!(fx
        .forge
        .upgrade_beacon(&admin, &fx.extension, CapabilityType::Permit, token)
        .is_err());

    assert_eq!(fx.forge.ledger().beacon(&beacon).unwrap().0, current);
    assert!(events < events_after_deploy);
    assert_eq!(fx.forge.events().len(), events_after_deploy);
}

#[test]
fn test_capability_upgrade_requires_factory_owner() {
    let mut fx = Fixture::fungible(&[CapabilityType::Permit]);
    let token = fx.deploy_token("alice");
    let permit = fx
        .forge
        .attach_capability(
            &ctx("alice"),
            &fx.base,
            &token,
            CapabilityType::Permit,
            &CapabilityParams::empty(),
        )
        .unwrap();
    let v2 = fx
        .forge
        .deploy_implementation(
            &ctx("alice"),
            BeaconTarget::Capability(CapabilityType::Permit),
            b"permit-v2".to_vec(),
        )
        .unwrap();

    assert_eq!(
        fx.forge
            .upgrade_beacon(&ctx("alice"), &fx.extension, CapabilityType::Permit, v2),
        Err(ForgeError::Unauthorized(addr("alice")))
    );
    let admin = fx.admin;
    fx.forge
        .upgrade_beacon(&admin, &fx.extension, CapabilityType::Permit, v2)
        .unwrap();
    assert_eq!(fx.forge.implementation_of(&permit), Ok(v2));
}

#[test]
fn test_governed_upgrade_by_council() {
    let mut fx = Fixture::fungible(&[CapabilityType::Votes]);
    fx.forge = fx
        .forge
        .with_governance(Arc::new(CouncilGovernance::new([addr("council")])));
    let v2 = fx
        .forge
        .deploy_implementation(
            &ctx("dev"),
            BeaconTarget::Capability(CapabilityType::Votes),
            b"votes-v2".to_vec(),
        )
        .unwrap();
    let target = BeaconTarget::Capability(CapabilityType::Votes);

    // not even the owner passes without the council
    let admin = fx.admin;
    assert!(matches!(
        fx.forge.propose_upgrade(&admin, &fx.extension, target, v2),
        Err(ForgeError::PolicyRejected(_))
    ));

    fx.forge
        .propose_upgrade(&ctx("council"), &fx.extension, target, v2)
        .unwrap();
    let beacon = fx
        .forge
        .extension_factory(&fx.extension)
        .and_then(|f| f.beacon(CapabilityType::Votes))
        .unwrap();
    assert_eq!(fx.forge.ledger().beacon(&beacon).unwrap().0, v2);
    assert!(fx
        .forge
        .events()
        .iter()
        .any(|r| matches!(r.event, ForgeEvent::UpgradeApproved { .. })));
}

#[test]
fn test_governance_error_rejects() {
    let mut fx = Fixture::fungible(&[]);
    fx.forge = fx.forge.with_governance(Arc::new(Offline));
    let admin = fx.admin;
    let v2 = fx
        .forge
        .deploy_implementation(&admin, BeaconTarget::Asset(AssetKind::Fungible), b"v2".to_vec())
        .unwrap();
    let master = fx.forge.master_implementation(&fx.base).unwrap();

    assert!(matches!(
        fx.forge
            .propose_upgrade(&admin, &fx.base, BeaconTarget::Asset(AssetKind::Fungible), v2),
        Err(ForgeError::PolicyRejected(_))
    ));
    let beacon = fx.forge.beacon(&fx.base).unwrap();
    assert_eq!(fx.forge.ledger().beacon(&beacon).unwrap().0, master);
}

#[test]
fn test_governed_path_without_governance_is_owner_only() {
    let mut fx = Fixture::fungible(&[]);
    let admin = fx.admin;
    let target = BeaconTarget::Asset(AssetKind::Fungible);
    let v2 = fx
        .forge
        .deploy_implementation(&admin, target, b"v2".to_vec())
        .unwrap();

    assert_eq!(
        fx.forge.propose_upgrade(&ctx("alice"), &fx.base, target, v2),
        Err(ForgeError::Unauthorized(addr("alice")))
    );
    assert!(fx.forge.propose_upgrade(&admin, &fx.base, target, v2).is_ok());
}

#[test]
fn test_asset_beacon_is_one_time() {
    let mut fx = Fixture::fungible(&[]);
    let admin = fx.admin;
    assert!(matches!(
        fx.forge.initialize_asset_beacon(&admin, &fx.base),
        Err(ForgeError::AlreadyRegistered(_))
    ));

    let other = fx
        .forge
        .create_asset_factory(&admin, AssetKind::Vault, b"vault".to_vec())
        .unwrap();
    let params = vault(addr("alice"));
    assert!(matches!(
        fx.forge.deploy_beacon(&ctx("alice"), &other, &params),
        Err(ForgeError::NotConfigured(_))
    ));
    assert!(fx.forge.deploy(&ctx("alice"), &other, &params).is_ok());
}
