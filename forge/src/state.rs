use std::sync::Arc;

use indexmap::IndexMap;

use forge_common::{crypto::Address, error::ForgeResult, event::ForgeEvent};

use crate::{
    beacon::UpgradeGovernance,
    capability::CapabilityFactory,
    context::ExecutionContext,
    deployment::AssetFactory,
    discovery::{ExtensionRouter, FactoryCatalog, FactoryStats},
    ledger::Ledger,
    policy::PolicyGate,
    registry::ExtensionRegistry,
};

/// Everything an operation may write. Snapshotted as a whole around each
/// operation so a failure anywhere restores all of it.
#[derive(Clone)]
pub struct ForgeState {
    pub(crate) ledger: Ledger,
    pub(crate) registry: ExtensionRegistry,
    pub(crate) catalog: FactoryCatalog,
    pub(crate) router: ExtensionRouter,
    pub(crate) asset_factories: IndexMap<Address, AssetFactory>,
    pub(crate) extension_factories: IndexMap<Address, CapabilityFactory>,
}

impl ForgeState {
    /// Catalogued factories report their figures after every deployment
    pub(crate) fn attest_stats(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        stats: FactoryStats,
    ) -> ForgeResult<()> {
        if !self.catalog.is_catalogued(factory) {
            return Ok(());
        }
        let total_deployments = stats.total_deployments;
        self.catalog.update_factory_stats(factory, factory, stats)?;
        self.ledger.emit(
            *factory,
            ctx,
            ForgeEvent::FactoryStatsUpdated {
                factory: *factory,
                total_deployments,
            },
        );
        Ok(())
    }
}

/// External collaborators consulted from inside an operation
#[derive(Clone, Default)]
pub struct Collaborators {
    pub policy: PolicyGate,
    pub governance: Option<Arc<dyn UpgradeGovernance>>,
}
