//! Default initializer logic for base assets and capability modules.
//!
//! Concrete business logic is out of scope: initializers decode their
//! payload, check it targets the right kind/type and persist it in the
//! instance's own storage. A second initialization is rejected.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use forge_common::{
    asset::{AssetKind, AssetParams},
    capability::{CapabilityParams, CapabilityType},
    crypto::Address,
};

use crate::{
    context::ExecutionContext,
    ledger::{ContractLogic, ContractStorage},
};

pub const KEY_INITIALIZED: &[u8] = b"initialized";
pub const KEY_INITIALIZER: &[u8] = b"initializer";
pub const KEY_PARAMS: &[u8] = b"params";
pub const KEY_OWNER: &[u8] = b"owner";
pub const KEY_ASSET: &[u8] = b"asset";

fn mark_initialized(
    storage: &mut ContractStorage,
    this: &Address,
    ctx: &ExecutionContext,
) -> anyhow::Result<()> {
    if storage.contains_key(KEY_INITIALIZED) {
        bail!("{} is already initialized", this);
    }
    storage.insert(KEY_INITIALIZED.to_vec(), vec![1]);
    storage.insert(KEY_INITIALIZER.to_vec(), ctx.caller.as_bytes().to_vec());
    Ok(())
}

/// Initializer of a base asset implementation
pub struct AssetLogic {
    kind: AssetKind,
    name: String,
}

impl AssetLogic {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            name: format!("{}-asset", kind),
        }
    }
}

impl ContractLogic for AssetLogic {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(
        &self,
        storage: &mut ContractStorage,
        this: &Address,
        ctx: &ExecutionContext,
        payload: &[u8],
    ) -> anyhow::Result<()> {
        let params: AssetParams =
            serde_json::from_slice(payload).context("decoding asset parameters")?;
        if params.kind() != self.kind {
            bail!(
                "{} implementation cannot initialize a {} asset",
                self.kind,
                params.kind()
            );
        }
        mark_initialized(storage, this, ctx)?;
        storage.insert(KEY_OWNER.to_vec(), params.owner().as_bytes().to_vec());
        storage.insert(KEY_PARAMS.to_vec(), payload.to_vec());
        Ok(())
    }
}

/// Payload handed to a capability initializer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityInit {
    pub asset: Address,
    pub capability_type: CapabilityType,
    pub params: CapabilityParams,
}

/// Initializer of a capability module implementation
pub struct CapabilityLogic {
    capability_type: CapabilityType,
    name: String,
}

impl CapabilityLogic {
    pub fn new(capability_type: CapabilityType) -> Self {
        Self {
            capability_type,
            name: format!("{}-capability", capability_type),
        }
    }
}

impl ContractLogic for CapabilityLogic {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(
        &self,
        storage: &mut ContractStorage,
        this: &Address,
        ctx: &ExecutionContext,
        payload: &[u8],
    ) -> anyhow::Result<()> {
        let init: CapabilityInit =
            serde_json::from_slice(payload).context("decoding capability init")?;
        if init.capability_type != self.capability_type {
            bail!(
                "{} implementation cannot initialize a {} module",
                self.capability_type,
                init.capability_type
            );
        }
        mark_initialized(storage, this, ctx)?;
        storage.insert(KEY_ASSET.to_vec(), init.asset.as_bytes().to_vec());
        storage.insert(KEY_PARAMS.to_vec(), serde_json::to_vec(&init.params)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::KindProfile;
    use forge_common::asset::{FungibleParams, MultiTokenParams};

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Address::from_label("factory"), 10, 1)
    }

    fn multi_token() -> Vec<u8> {
        serde_json::to_vec(&AssetParams::MultiToken(MultiTokenParams {
            name: "Items".to_string(),
            uri: "ipfs://items".to_string(),
            owner: Address::from_label("alice"),
        }))
        .unwrap()
    }

    #[test]
    fn test_asset_logic_initializes_once() {
        let logic = AssetLogic::new(AssetKind::MultiToken);
        let this = Address::from_label("instance");
        let mut storage = ContractStorage::new();

        logic
            .initialize(&mut storage, &this, &ctx(), &multi_token())
            .unwrap();
        assert_eq!(
            storage.get(KEY_OWNER),
            Some(&Address::from_label("alice").as_bytes().to_vec())
        );
        assert!(logic
            .initialize(&mut storage, &this, &ctx(), &multi_token())
            .is_err());
    }

    #[test]
    fn test_asset_logic_decodes_fungible_amounts() {
        let params = AssetParams::Fungible(FungibleParams {
            name: "Token".to_string(),
            symbol: "TKN".to_string(),
            decimals: 18,
            initial_supply: 1_000_000 * 10u128.pow(18),
            max_supply: Some(u128::MAX),
            owner: Address::from_label("alice"),
        });
        let payload = KindProfile::for_kind(AssetKind::Fungible)
            .encode_init(&params)
            .unwrap();

        let mut storage = ContractStorage::new();
        AssetLogic::new(AssetKind::Fungible)
            .initialize(&mut storage, &Address::from_label("token"), &ctx(), &payload)
            .unwrap();
        assert_eq!(storage.get(KEY_PARAMS), Some(&payload));
    }

    #[test]
    fn test_asset_logic_rejects_other_kind() {
        let logic = AssetLogic::new(AssetKind::Fungible);
        let mut storage = ContractStorage::new();
        let err = logic
            .initialize(&mut storage, &Address::zero(), &ctx(), &multi_token())
            .unwrap_err();
        assert!(err.to_string().contains("multi-token"));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_capability_logic() {
        let logic = CapabilityLogic::new(CapabilityType::Royalty);
        let asset = Address::from_label("asset");
        let payload = serde_json::to_vec(&CapabilityInit {
            asset,
            capability_type: CapabilityType::Royalty,
            params: CapabilityParams::new(serde_json::json!({ "bps": 500 })),
        })
        .unwrap();
        let mut storage = ContractStorage::new();
        logic
            .initialize(&mut storage, &Address::zero(), &ctx(), &payload)
            .unwrap();
        assert_eq!(storage.get(KEY_ASSET), Some(&asset.as_bytes().to_vec()));

        let wrong = CapabilityLogic::new(CapabilityType::Permit);
        assert!(wrong
            .initialize(&mut ContractStorage::new(), &Address::zero(), &ctx(), &payload)
            .is_err());
    }
}
