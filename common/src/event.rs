//! Forge Events
//!
//! Every state change emits one event naming the actors, the kind/type and
//! the resulting address. Events are part of the external contract and are
//! consumed by off-chain indexers; nothing in the core reads them back.

use serde::{Deserialize, Serialize};

use crate::{
    asset::AssetKind,
    capability::CapabilityType,
    crypto::{Address, Hash},
    domain::{BeaconTarget, DeploymentMode, FactoryDomain},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ForgeEvent {
    // ===== Setup =====
    AssetFactoryCreated {
        factory: Address,
        kind: AssetKind,
        master: Address,
        owner: Address,
    },
    ExtensionFactoryCreated {
        factory: Address,
        kind: AssetKind,
        owner: Address,
    },
    ImplementationDeployed {
        implementation: Address,
        code_hash: Hash,
        deployer: Address,
    },
    RegistrarGranted {
        account: Address,
        by: Address,
    },
    RegistrarRevoked {
        account: Address,
        by: Address,
    },

    // ===== Deployment =====
    AssetDeployed {
        asset: Address,
        kind: AssetKind,
        factory: Address,
        deployer: Address,
        mode: DeploymentMode,
    },
    CapabilityDeployed {
        capability: Address,
        asset: Address,
        capability_type: CapabilityType,
        factory: Address,
        deployer: Address,
    },

    // ===== Registry =====
    CapabilityRegistered {
        capability: Address,
        asset: Address,
        capability_type: CapabilityType,
        kind: AssetKind,
    },
    CapabilityDeactivated {
        capability: Address,
        by: Address,
    },
    CapabilityReactivated {
        capability: Address,
        by: Address,
    },
    CompatibilitySet {
        kind: AssetKind,
        capability_type: CapabilityType,
        compatible: bool,
        by: Address,
    },
    BeaconRegistered {
        capability_type: CapabilityType,
        beacon: Address,
        previous: Option<Address>,
    },

    // ===== Beacons =====
    BeaconCreated {
        beacon: Address,
        target: BeaconTarget,
        implementation: Address,
        owner: Address,
    },
    BeaconUpgraded {
        beacon: Address,
        target: BeaconTarget,
        previous: Address,
        implementation: Address,
        by: Address,
    },
    UpgradeApproved {
        beacon: Address,
        target: BeaconTarget,
        implementation: Address,
        proposer: Address,
    },

    // ===== Catalog =====
    FactoryRegistered {
        factory: Address,
        domain: FactoryDomain,
        version: String,
    },
    FactoryDeprecated {
        factory: Address,
    },
    FactoryActivated {
        factory: Address,
    },
    LatestFactorySet {
        domain: FactoryDomain,
        factory: Address,
    },
    FactoryStatsUpdated {
        factory: Address,
        total_deployments: u64,
    },
}

impl ForgeEvent {
    /// Stable event name, used as log target and indexer topic
    pub fn name(&self) -> &'static str {
        match self {
            Self::AssetFactoryCreated { .. } => "asset_factory_created",
            Self::ExtensionFactoryCreated { .. } => "extension_factory_created",
            Self::ImplementationDeployed { .. } => "implementation_deployed",
            Self::RegistrarGranted { .. } => "registrar_granted",
            Self::RegistrarRevoked { .. } => "registrar_revoked",
            Self::AssetDeployed { .. } => "asset_deployed",
            Self::CapabilityDeployed { .. } => "capability_deployed",
            Self::CapabilityRegistered { .. } => "capability_registered",
            Self::CapabilityDeactivated { .. } => "capability_deactivated",
            Self::CapabilityReactivated { .. } => "capability_reactivated",
            Self::CompatibilitySet { .. } => "compatibility_set",
            Self::BeaconRegistered { .. } => "beacon_registered",
            Self::BeaconCreated { .. } => "beacon_created",
            Self::BeaconUpgraded { .. } => "beacon_upgraded",
            Self::UpgradeApproved { .. } => "upgrade_approved",
            Self::FactoryRegistered { .. } => "factory_registered",
            Self::FactoryDeprecated { .. } => "factory_deprecated",
            Self::FactoryActivated { .. } => "factory_activated",
            Self::LatestFactorySet { .. } => "latest_factory_set",
            Self::FactoryStatsUpdated { .. } => "factory_stats_updated",
        }
    }
}
