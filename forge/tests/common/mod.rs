#![allow(dead_code)]

use std::sync::Arc;

use forge_common::{
    asset::{AssetKind, AssetParams, FungibleParams, NonFungibleParams, VaultParams},
    capability::CapabilityType,
    crypto::Address,
    domain::FactoryDomain,
};
use forge_engine::{config::ForgeConfig, context::ExecutionContext, policy::PolicyEngine, Forge};

pub const GENESIS_TIME: u64 = 1_700_000_000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn addr(label: &str) -> Address {
    Address::from_label(label)
}

pub fn ctx(label: &str) -> ExecutionContext {
    ExecutionContext::new(addr(label), GENESIS_TIME, 1)
}

pub fn new_forge() -> Forge {
    init_logger();
    Forge::new(addr("admin"), ForgeConfig::default()).expect("genesis")
}

pub fn fungible(owner: Address) -> AssetParams {
    AssetParams::Fungible(FungibleParams {
        name: "Test Token".to_string(),
        symbol: "TST".to_string(),
        decimals: 18,
        initial_supply: 1_000_000,
        max_supply: None,
        owner,
    })
}

pub fn non_fungible(owner: Address) -> AssetParams {
    AssetParams::NonFungible(NonFungibleParams {
        name: "Test Collection".to_string(),
        symbol: "COL".to_string(),
        base_uri: "ipfs://collection/".to_string(),
        max_supply: Some(10_000),
        owner,
    })
}

pub fn vault(owner: Address) -> AssetParams {
    AssetParams::Vault(VaultParams {
        name: "Test Vault".to_string(),
        symbol: "VLT".to_string(),
        underlying: addr("usdc"),
        owner,
    })
}

/// A forge with a catalogued base factory and extension factory for one kind
pub struct Fixture {
    pub forge: Forge,
    pub admin: ExecutionContext,
    pub base: Address,
    pub extension: Address,
}

impl Fixture {
    pub fn new(kind: AssetKind, types: &[CapabilityType]) -> Self {
        let mut forge = new_forge();
        let admin = ctx("admin");

        let base = forge
            .create_asset_factory(&admin, kind, format!("{kind}-master-v1").into_bytes())
            .expect("base factory");
        forge
            .initialize_asset_beacon(&admin, &base)
            .expect("asset beacon");
        let extension = forge
            .create_extension_factory(&admin, kind)
            .expect("extension factory");
        forge
            .initialize_beacons(
                &admin,
                &extension,
                types
                    .iter()
                    .map(|ty| (*ty, format!("{ty}-module-v1").into_bytes()))
                    .collect(),
            )
            .expect("capability beacons");

        forge
            .register_factory(&admin, base, FactoryDomain::Base(kind), "1.0.0", "base")
            .expect("catalog base");
        forge
            .register_factory(
                &admin,
                extension,
                FactoryDomain::Extension(kind),
                "1.0.0",
                "extensions",
            )
            .expect("catalog extension");

        Self {
            forge,
            admin,
            base,
            extension,
        }
    }

    pub fn with_policy(mut self, engine: Arc<dyn PolicyEngine>) -> Self {
        self.forge = self.forge.with_policy_engine(engine);
        self
    }

    pub fn fungible(types: &[CapabilityType]) -> Self {
        Self::new(AssetKind::Fungible, types)
    }

    /// Deploy a fungible clone owned by `label`
    pub fn deploy_token(&mut self, label: &str) -> Address {
        self.forge
            .deploy(&ctx(label), &self.base, &fungible(addr(label)))
            .expect("deploy")
    }
}
