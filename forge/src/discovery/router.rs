use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use forge_common::{
    asset::AssetKind,
    capability::CapabilityType,
    crypto::Address,
    domain::FactoryDomain,
    error::{ForgeError, ForgeResult, InvalidParam},
};

use super::FactoryCatalog;
use crate::{
    capability::{check_attach_target, CapabilityFactory},
    ledger::Ledger,
    registry::ExtensionRegistry,
};

/// Result of the attach dry-run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttachEligibility {
    Eligible { factory: Address },
    Incompatible,
    /// The target is not a base asset (no code, or no asset record)
    NoAsset,
    /// The target is a base asset of another kind
    KindMismatch,
    AlreadyAttached { capability: Address },
    NoFactory,
    NoBeacon { factory: Address },
}

impl AttachEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }
}

/// Stateless resolver from an asset kind to its live extension factory
#[derive(Clone, Debug)]
pub struct ExtensionRouter {
    address: Address,
}

impl ExtensionRouter {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Latest extension factory catalogued for `kind`; it must be active
    pub fn resolve(&self, catalog: &FactoryCatalog, kind: AssetKind) -> ForgeResult<Address> {
        let domain = FactoryDomain::Extension(kind);
        let record = catalog
            .get_latest_factory(domain)
            .ok_or_else(|| ForgeError::not_configured(format!("no factory for {domain}")))?;
        if !record.is_live() {
            return Err(ForgeError::not_configured(format!(
                "factory {} for {} is not active",
                record.address, domain
            )));
        }
        Ok(record.address)
    }

    /// Fold compatibility, the asset target check, per-asset uniqueness and
    /// factory existence into one answer, without touching any state
    pub fn attach_eligibility(
        &self,
        catalog: &FactoryCatalog,
        ledger: &Ledger,
        registry: &ExtensionRegistry,
        factories: &IndexMap<Address, CapabilityFactory>,
        asset: &Address,
        kind: AssetKind,
        capability_type: CapabilityType,
    ) -> AttachEligibility {
        if !registry.is_compatible(kind, capability_type) {
            return AttachEligibility::Incompatible;
        }
        match check_attach_target(ledger, registry, asset, kind) {
            Ok(()) => {}
            Err(ForgeError::InvalidParameter(InvalidParam::KindMismatch)) => {
                return AttachEligibility::KindMismatch;
            }
            Err(_) => return AttachEligibility::NoAsset,
        }
        if let Some(capability) = registry.get_capability_by_type(asset, capability_type) {
            return AttachEligibility::AlreadyAttached { capability };
        }
        let Ok(factory) = self.resolve(catalog, kind) else {
            return AttachEligibility::NoFactory;
        };
        match factories.get(&factory) {
            Some(extension) if extension.beacon(capability_type).is_some() => {
                AttachEligibility::Eligible { factory }
            }
            Some(_) => AttachEligibility::NoBeacon { factory },
            None => AttachEligibility::NoFactory,
        }
    }

    pub fn can_attach(
        &self,
        catalog: &FactoryCatalog,
        ledger: &Ledger,
        registry: &ExtensionRegistry,
        factories: &IndexMap<Address, CapabilityFactory>,
        asset: &Address,
        kind: AssetKind,
        capability_type: CapabilityType,
    ) -> bool {
        self.attach_eligibility(
            catalog,
            ledger,
            registry,
            factories,
            asset,
            kind,
            capability_type,
        )
        .is_eligible()
    }
}
