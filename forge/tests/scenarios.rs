#![allow(clippy::disallowed_methods)]

mod common;

use common::*;
use forge_common::{
    asset::AssetKind,
    capability::{CapabilityParams, CapabilityType},
    crypto::Hash,
    domain::{DeploymentMode, FactoryDomain},
    error::ForgeError,
    event::ForgeEvent,
};

#[test]
fn test_attach_permit_then_repeat_fails() {
    let mut fx = Fixture::fungible(&[CapabilityType::Permit]);
    let alice = ctx("alice");
    let token = fx.deploy_token("alice");

    let permit = fx
        .forge
        .attach_capability(
            &alice,
            &fx.base,
            &token,
            CapabilityType::Permit,
            &CapabilityParams::empty(),
        )
        .unwrap();

    let registry = fx.forge.registry();
    assert_eq!(
        registry.get_capability_by_type(&token, CapabilityType::Permit),
        Some(permit)
    );
    let instance = registry.get_instance(&permit).unwrap();
    assert_eq!(instance.asset, token);
    assert_eq!(instance.deployer, addr("alice"));
    assert_eq!(instance.factory, fx.extension);
    assert!(instance.active);

    let err = fx
        .forge
        .attach_capability(
            &alice,
            &fx.base,
            &token,
            CapabilityType::Permit,
            &CapabilityParams::empty(),
        )
        .unwrap_err();
    assert!(matches!(err, ForgeError::AlreadyAttached { .. }));
    assert_eq!(fx.forge.registry().get_asset_capabilities(&token), &[permit]);
}

#[test]
fn test_latest_factory_and_exact_versions() {
    let mut forge = new_forge();
    let admin = ctx("admin");
    let f1 = forge
        .create_asset_factory(&admin, AssetKind::NonFungible, b"nft-v1".to_vec())
        .unwrap();
    let f2 = forge
        .create_asset_factory(&admin, AssetKind::NonFungible, b"nft-v2".to_vec())
        .unwrap();
    let domain = FactoryDomain::Base(AssetKind::NonFungible);

    forge
        .register_factory(&admin, f1, domain, "v1.0.0", "first")
        .unwrap();
    forge
        .register_factory(&admin, f2, domain, "v2.0.0", "second")
        .unwrap();

    let catalog = forge.catalog();
    assert_eq!(catalog.get_latest_factory(domain).unwrap().address, f2);
    assert_eq!(
        catalog.get_factory_by_version(domain, "v1.0.0").unwrap().address,
        f1
    );
    assert_eq!(
        catalog.get_factory_by_version(domain, "1.0.0").unwrap().address,
        f1
    );
    assert_eq!(catalog.get_factories_by_domain(domain).len(), 2);

    // same version again in the domain
    let f3 = forge
        .create_asset_factory(&admin, AssetKind::NonFungible, b"nft-v3".to_vec())
        .unwrap();
    assert!(matches!(
        forge.register_factory(&admin, f3, domain, "1.0.0", ""),
        Err(ForgeError::AlreadyRegistered(_))
    ));
    assert_eq!(forge.catalog().get_latest_factory(domain).unwrap().address, f2);
}

#[test]
fn test_deterministic_deploy_twice_collides() {
    let mut fx = Fixture::fungible(&[]);
    let alice = ctx("alice");
    let salt = Hash::from_u64(1);
    let params = fungible(addr("alice"));

    let predicted = fx.forge.predict_address(&fx.base, &salt).unwrap();
    let deployed = fx
        .forge
        .deploy_deterministic(&alice, &fx.base, salt.clone(), &params)
        .unwrap();
    assert_eq!(deployed, predicted);

    let err = fx
        .forge
        .deploy_deterministic(&alice, &fx.base, salt, &params)
        .unwrap_err();
    assert_eq!(err, ForgeError::AddressCollision(predicted));

    let factory = fx.forge.asset_factory(&fx.base).unwrap();
    assert_eq!(factory.record().total(), 1);
    assert!(factory.is_instance(&predicted));
    assert_eq!(
        factory.record().get(&predicted).unwrap().mode,
        DeploymentMode::Deterministic
    );
    let deployments = fx
        .forge
        .events()
        .iter()
        .filter(|r| matches!(r.event, ForgeEvent::AssetDeployed { .. }))
        .count();
    assert_eq!(deployments, 1);
}

#[test]
fn test_two_capabilities_in_registration_order() {
    let mut fx = Fixture::fungible(&[CapabilityType::Votes, CapabilityType::Burnable]);
    let alice = ctx("alice");
    let token = fx.deploy_token("alice");

    let burnable = fx
        .forge
        .deploy_capability(
            &alice,
            &fx.extension,
            &token,
            CapabilityType::Burnable,
            &CapabilityParams::empty(),
        )
        .unwrap();
    let votes = fx
        .forge
        .deploy_capability(
            &alice,
            &fx.extension,
            &token,
            CapabilityType::Votes,
            &CapabilityParams::empty(),
        )
        .unwrap();

    assert_ne!(burnable, votes);
    assert_eq!(
        fx.forge.registry().get_asset_capabilities(&token),
        &[burnable, votes]
    );
    assert!(fx.forge.registry().has_capability(&token, CapabilityType::Votes));
}

#[test]
fn test_deactivate_reactivate_only_flips_flag() {
    let mut fx = Fixture::fungible(&[CapabilityType::Pausable]);
    let token = fx.deploy_token("alice");
    let pausable = fx
        .forge
        .deploy_capability(
            &ctx("alice"),
            &fx.extension,
            &token,
            CapabilityType::Pausable,
            &CapabilityParams::empty(),
        )
        .unwrap();
    let before = fx.forge.registry().get_instance(&pausable).unwrap().clone();

    let admin = fx.admin;
    assert!(fx.forge.deactivate_capability(&admin, &pausable).unwrap());
    assert!(!fx.forge.deactivate_capability(&admin, &pausable).unwrap());
    assert!(!fx.forge.registry().get_instance(&pausable).unwrap().active);
    assert!(fx.forge.reactivate_capability(&admin, &pausable).unwrap());

    let after = fx.forge.registry().get_instance(&pausable).unwrap();
    assert_eq!(after, &before);

    assert!(matches!(
        fx.forge.deactivate_capability(&ctx("alice"), &pausable),
        Err(ForgeError::Unauthorized(_))
    ));
}

#[test]
fn test_incompatible_pair_never_registered() {
    let mut fx = Fixture::fungible(&[CapabilityType::Snapshot]);
    let token = fx.deploy_token("alice");
    let admin = fx.admin;

    fx.forge
        .set_compatibility(&admin, AssetKind::Fungible, CapabilityType::Snapshot, false)
        .unwrap();
    let err = fx
        .forge
        .attach_capability(
            &ctx("alice"),
            &fx.base,
            &token,
            CapabilityType::Snapshot,
            &CapabilityParams::empty(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        ForgeError::Incompatible {
            kind: AssetKind::Fungible,
            capability_type: CapabilityType::Snapshot
        }
    );
    assert!(fx.forge.registry().get_asset_capabilities(&token).is_empty());

    fx.forge
        .set_compatibility(&admin, AssetKind::Fungible, CapabilityType::Snapshot, true)
        .unwrap();
    assert!(fx
        .forge
        .attach_capability(
            &ctx("alice"),
            &fx.base,
            &token,
            CapabilityType::Snapshot,
            &CapabilityParams::empty(),
        )
        .is_ok());
}

#[test]
fn test_enabled_pair_gets_beacon_and_attaches() {
    let mut fx = Fixture::new(AssetKind::Vault, &[]);
    let admin = fx.admin;
    let alice = ctx("alice");
    let asset = fx
        .forge
        .deploy(&alice, &fx.base, &vault(addr("alice")))
        .unwrap();
    let permit = || vec![(CapabilityType::Permit, b"permit-module-v1".to_vec())];

    assert_eq!(
        fx.forge.initialize_beacons(&admin, &fx.extension, permit()),
        Err(ForgeError::Incompatible {
            kind: AssetKind::Vault,
            capability_type: CapabilityType::Permit
        })
    );

    fx.forge
        .set_compatibility(&admin, AssetKind::Vault, CapabilityType::Permit, true)
        .unwrap();
    let beacons = fx
        .forge
        .initialize_beacons(&admin, &fx.extension, permit())
        .unwrap();
    assert_eq!(
        fx.forge.registry().beacon_for(CapabilityType::Permit),
        Some(beacons[0])
    );
    assert!(fx
        .forge
        .can_attach(&asset, AssetKind::Vault, CapabilityType::Permit));

    let capability = fx
        .forge
        .attach_capability(
            &alice,
            &fx.base,
            &asset,
            CapabilityType::Permit,
            &CapabilityParams::empty(),
        )
        .unwrap();
    let instance = fx.forge.registry().get_instance(&capability).unwrap();
    assert_eq!(instance.kind, AssetKind::Vault);
    assert_eq!(instance.factory, fx.extension);
}
