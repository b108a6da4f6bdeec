//! The forge: owns every component and runs each public operation as one
//! all-or-nothing unit.

use std::sync::Arc;

use log::{debug, info};
use metrics::counter;

use forge_common::{
    asset::{AssetKind, AssetParams},
    capability::{CapabilityParams, CapabilityType},
    config::{CATALOG_ACCOUNT_LABEL, REGISTRY_ACCOUNT_LABEL, ROUTER_ACCOUNT_LABEL},
    crypto::{Address, Hash},
    domain::{BeaconTarget, FactoryDomain},
    error::{ForgeError, ForgeResult},
    event::ForgeEvent,
    validation::validate_owner,
};

use crate::{
    beacon::{self, CouncilGovernance, UpgradeGovernance},
    capability::{self, CapabilityFactory, ModuleImplementation},
    config::ForgeConfig,
    context::ExecutionContext,
    deployment::{self, AssetFactory, Placement},
    discovery::{AttachEligibility, ExtensionRouter, FactoryCatalog, FactoryStats},
    ledger::{AccountCode, ContractLogic, EventRecord, Ledger},
    logic::{AssetLogic, CapabilityLogic},
    policy::{DenyListPolicy, PolicyEngine, PolicyGate},
    registry::ExtensionRegistry,
    snapshot::SnapshotGuard,
    state::{Collaborators, ForgeState},
};

pub struct Forge {
    state: ForgeState,
    collaborators: Collaborators,
    config: ForgeConfig,
}

impl Forge {
    /// Genesis: system accounts, registry seeded with the configured matrix,
    /// empty catalog. `admin` administers registry and catalog.
    pub fn new(admin: Address, config: ForgeConfig) -> ForgeResult<Self> {
        validate_owner(&admin)?;
        config.validate()?;

        let registry_address = Address::system(REGISTRY_ACCOUNT_LABEL);
        let catalog_address = Address::system(CATALOG_ACCOUNT_LABEL);
        let router_address = Address::system(ROUTER_ACCOUNT_LABEL);

        let mut ledger = Ledger::new();
        for (address, label) in [
            (registry_address, REGISTRY_ACCOUNT_LABEL),
            (catalog_address, CATALOG_ACCOUNT_LABEL),
            (router_address, ROUTER_ACCOUNT_LABEL),
        ] {
            ledger.insert_account(address, AccountCode::System(label.to_string()), 0)?;
        }

        let registry = ExtensionRegistry::new(
            registry_address,
            admin,
            config.compatibility_matrix(),
            config.capability_version_tag.clone(),
            config.max_page_size,
        );
        let catalog = FactoryCatalog::new(catalog_address, admin, config.max_page_size);

        let mut collaborators = Collaborators::default();
        if !config.denied_deployers.is_empty() {
            let policy: Arc<dyn PolicyEngine> =
                Arc::new(DenyListPolicy::new(config.denied_deployers.iter().copied()));
            collaborators.policy = PolicyGate::new(Some(policy));
        }
        if !config.upgrade_council.is_empty() {
            collaborators.governance = Some(Arc::new(CouncilGovernance::new(
                config.upgrade_council.iter().copied(),
            )));
        }

        info!(
            "forge genesis: admin {}, {} compatible pairs",
            admin,
            registry.matrix().allowed_count()
        );

        Ok(Self {
            state: ForgeState {
                ledger,
                registry,
                catalog,
                router: ExtensionRouter::new(router_address),
                asset_factories: Default::default(),
                extension_factories: Default::default(),
            },
            collaborators,
            config,
        })
    }

    /// Replace the policy collaborator
    pub fn with_policy_engine(mut self, engine: Arc<dyn PolicyEngine>) -> Self {
        self.collaborators.policy = PolicyGate::new(Some(engine));
        self
    }

    /// Replace the upgrade governance collaborator
    pub fn with_governance(mut self, governance: Arc<dyn UpgradeGovernance>) -> Self {
        self.collaborators.governance = Some(governance);
        self
    }

    /// Run `op` against a snapshot of the state; any error restores it.
    ///
    /// The event log is append-only, so it is kept out of the snapshot: the
    /// operation starts from an empty log and only what it emitted is
    /// discarded on failure.
    fn transact<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut ForgeState, &Collaborators) -> ForgeResult<T>,
    ) -> ForgeResult<T> {
        let log = self.state.ledger.take_events();
        let mut guard = SnapshotGuard::new(&mut self.state);
        let result = match op(guard.state_mut(), &self.collaborators) {
            Ok(value) => {
                guard.commit();
                Ok(value)
            }
            Err(err) => {
                drop(guard);
                counter!("forge_operations_rolled_back", "operation" => operation).increment(1);
                debug!("{} rolled back: {} (code {:#06x})", operation, err, err.code());
                Err(err)
            }
        };
        self.state.ledger.restore_events(log);
        result
    }

    // ===== Setup =====

    /// Admin-only: deploy a master implementation with the default
    /// initializer of `kind` and create its factory
    pub fn create_asset_factory(
        &mut self,
        ctx: &ExecutionContext,
        kind: AssetKind,
        master_bytecode: Vec<u8>,
    ) -> ForgeResult<Address> {
        self.create_asset_factory_with_logic(
            ctx,
            kind,
            master_bytecode,
            Arc::new(AssetLogic::new(kind)),
        )
    }

    pub fn create_asset_factory_with_logic(
        &mut self,
        ctx: &ExecutionContext,
        kind: AssetKind,
        master_bytecode: Vec<u8>,
        logic: Arc<dyn ContractLogic>,
    ) -> ForgeResult<Address> {
        self.transact("create_asset_factory", |state, _| {
            deployment::create_asset_factory(state, ctx, kind, master_bytecode, logic)
        })
    }

    pub fn create_extension_factory(
        &mut self,
        ctx: &ExecutionContext,
        kind: AssetKind,
    ) -> ForgeResult<Address> {
        self.transact("create_extension_factory", |state, _| {
            capability::create_extension_factory(state, ctx, kind)
        })
    }

    pub fn initialize_asset_beacon(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
    ) -> ForgeResult<Address> {
        self.transact("initialize_asset_beacon", |state, _| {
            deployment::initialize_asset_beacon(state, ctx, factory)
        })
    }

    /// Owner-only: one beacon per capability type, each backed by the
    /// default initializer of the type
    pub fn initialize_beacons(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        implementations: Vec<(CapabilityType, Vec<u8>)>,
    ) -> ForgeResult<Vec<Address>> {
        let modules = implementations
            .into_iter()
            .map(|(capability_type, bytecode)| ModuleImplementation::new(capability_type, bytecode))
            .collect();
        self.initialize_beacons_with(ctx, factory, modules)
    }

    pub fn initialize_beacons_with(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        modules: Vec<ModuleImplementation>,
    ) -> ForgeResult<Vec<Address>> {
        self.transact("initialize_beacons", |state, _| {
            capability::initialize_beacons(state, ctx, factory, modules)
        })
    }

    /// Deploy implementation code for later upgrades of `target`'s family
    pub fn deploy_implementation(
        &mut self,
        ctx: &ExecutionContext,
        target: BeaconTarget,
        bytecode: Vec<u8>,
    ) -> ForgeResult<Address> {
        let logic: Arc<dyn ContractLogic> = match target {
            BeaconTarget::Asset(kind) => Arc::new(AssetLogic::new(kind)),
            BeaconTarget::Capability(capability_type) => {
                Arc::new(CapabilityLogic::new(capability_type))
            }
        };
        self.deploy_implementation_with_logic(ctx, bytecode, logic)
    }

    pub fn deploy_implementation_with_logic(
        &mut self,
        ctx: &ExecutionContext,
        bytecode: Vec<u8>,
        logic: Arc<dyn ContractLogic>,
    ) -> ForgeResult<Address> {
        self.transact("deploy_implementation", |state, _| {
            let implementation = state.ledger.deploy_code(
                &ctx.caller,
                bytecode,
                logic,
                ctx.timestamp,
            )?;
            let code_hash = state.ledger.code_hash(&implementation)?;
            state.ledger.emit(
                ctx.caller,
                ctx,
                ForgeEvent::ImplementationDeployed {
                    implementation,
                    code_hash,
                    deployer: ctx.caller,
                },
            );
            Ok(implementation)
        })
    }

    pub fn grant_registrar(
        &mut self,
        ctx: &ExecutionContext,
        account: Address,
    ) -> ForgeResult<bool> {
        self.transact("grant_registrar", |state, _| {
            let added = state.registry.grant_registrar(&ctx.caller, account)?;
            if added {
                let emitter = *state.registry.address();
                state.ledger.emit(
                    emitter,
                    ctx,
                    ForgeEvent::RegistrarGranted {
                        account,
                        by: ctx.caller,
                    },
                );
            }
            Ok(added)
        })
    }

    pub fn revoke_registrar(
        &mut self,
        ctx: &ExecutionContext,
        account: Address,
    ) -> ForgeResult<bool> {
        self.transact("revoke_registrar", |state, _| {
            let removed = state.registry.revoke_registrar(&ctx.caller, &account)?;
            if removed {
                let emitter = *state.registry.address();
                state.ledger.emit(
                    emitter,
                    ctx,
                    ForgeEvent::RegistrarRevoked {
                        account,
                        by: ctx.caller,
                    },
                );
            }
            Ok(removed)
        })
    }

    // ===== Deployment =====

    /// Clone of the master at the factory's next nonce address
    pub fn deploy(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        params: &AssetParams,
    ) -> ForgeResult<Address> {
        self.transact("deploy", |state, collaborators| {
            deployment::deploy(state, collaborators, ctx, factory, Placement::Clone, params)
        })
    }

    /// Clone of the master at the address [`Forge::predict_address`] gives
    pub fn deploy_deterministic(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        salt: Hash,
        params: &AssetParams,
    ) -> ForgeResult<Address> {
        self.transact("deploy_deterministic", |state, collaborators| {
            deployment::deploy(
                state,
                collaborators,
                ctx,
                factory,
                Placement::Deterministic { salt },
                params,
            )
        })
    }

    /// Upgradeable proxy of the factory's kind beacon
    pub fn deploy_beacon(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        params: &AssetParams,
    ) -> ForgeResult<Address> {
        self.transact("deploy_beacon", |state, collaborators| {
            deployment::deploy(state, collaborators, ctx, factory, Placement::Beacon, params)
        })
    }

    pub fn predict_address(&self, factory: &Address, salt: &Hash) -> ForgeResult<Address> {
        deployment::predict_address(&self.state, factory, salt)
    }

    pub fn is_instance(&self, factory: &Address, address: &Address) -> bool {
        self.state
            .asset_factories
            .get(factory)
            .is_some_and(|f| f.is_instance(address))
    }

    pub fn master_implementation(&self, factory: &Address) -> Option<Address> {
        self.state
            .asset_factories
            .get(factory)
            .map(|f| *f.master_implementation())
    }

    pub fn beacon(&self, factory: &Address) -> Option<Address> {
        self.state
            .asset_factories
            .get(factory)
            .and_then(AssetFactory::beacon)
    }

    // ===== Capabilities =====

    pub fn deploy_capability(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        asset: &Address,
        capability_type: CapabilityType,
        params: &CapabilityParams,
    ) -> ForgeResult<Address> {
        self.transact("deploy_capability", |state, collaborators| {
            capability::deploy_capability(
                state,
                collaborators,
                ctx,
                factory,
                asset,
                capability_type,
                params,
            )
        })
    }

    /// Attach through a base factory: the router picks the extension factory
    pub fn attach_capability(
        &mut self,
        ctx: &ExecutionContext,
        base_factory: &Address,
        asset: &Address,
        capability_type: CapabilityType,
        params: &CapabilityParams,
    ) -> ForgeResult<Address> {
        self.transact("attach_capability", |state, collaborators| {
            deployment::attach_capability(
                state,
                collaborators,
                ctx,
                base_factory,
                asset,
                capability_type,
                params,
            )
        })
    }

    // ===== Registry administration =====

    pub fn set_compatibility(
        &mut self,
        ctx: &ExecutionContext,
        kind: AssetKind,
        capability_type: CapabilityType,
        compatible: bool,
    ) -> ForgeResult<()> {
        self.transact("set_compatibility", |state, _| {
            state
                .registry
                .set_compatibility(&ctx.caller, kind, capability_type, compatible)?;
            let emitter = *state.registry.address();
            state.ledger.emit(
                emitter,
                ctx,
                ForgeEvent::CompatibilitySet {
                    kind,
                    capability_type,
                    compatible,
                    by: ctx.caller,
                },
            );
            Ok(())
        })
    }

    pub fn deactivate_capability(
        &mut self,
        ctx: &ExecutionContext,
        capability: &Address,
    ) -> ForgeResult<bool> {
        self.transact("deactivate_capability", |state, _| {
            let changed = state.registry.deactivate_capability(&ctx.caller, capability)?;
            if changed {
                let emitter = *state.registry.address();
                state.ledger.emit(
                    emitter,
                    ctx,
                    ForgeEvent::CapabilityDeactivated {
                        capability: *capability,
                        by: ctx.caller,
                    },
                );
            }
            Ok(changed)
        })
    }

    pub fn reactivate_capability(
        &mut self,
        ctx: &ExecutionContext,
        capability: &Address,
    ) -> ForgeResult<bool> {
        self.transact("reactivate_capability", |state, _| {
            let changed = state.registry.reactivate_capability(&ctx.caller, capability)?;
            if changed {
                let emitter = *state.registry.address();
                state.ledger.emit(
                    emitter,
                    ctx,
                    ForgeEvent::CapabilityReactivated {
                        capability: *capability,
                        by: ctx.caller,
                    },
                );
            }
            Ok(changed)
        })
    }

    /// Record the beacon backing a type; the beacon must exist on the ledger
    pub fn register_beacon(
        &mut self,
        ctx: &ExecutionContext,
        capability_type: CapabilityType,
        beacon: Address,
    ) -> ForgeResult<()> {
        self.transact("register_beacon", |state, _| {
            if state.ledger.beacon(&beacon).is_none() {
                return Err(ForgeError::NoCode(beacon));
            }
            state
                .registry
                .register_beacon(&ctx.caller, capability_type, beacon)?;
            let emitter = *state.registry.address();
            state.ledger.emit(
                emitter,
                ctx,
                ForgeEvent::BeaconRegistered {
                    capability_type,
                    beacon,
                    previous: None,
                },
            );
            Ok(())
        })
    }

    /// Admin-only explicit re-point of the beacon recorded for a type
    pub fn repoint_beacon(
        &mut self,
        ctx: &ExecutionContext,
        capability_type: CapabilityType,
        beacon: Address,
    ) -> ForgeResult<Option<Address>> {
        self.transact("repoint_beacon", |state, _| {
            if state.ledger.beacon(&beacon).is_none() {
                return Err(ForgeError::NoCode(beacon));
            }
            let previous = state
                .registry
                .repoint_beacon(&ctx.caller, capability_type, beacon)?;
            let emitter = *state.registry.address();
            state.ledger.emit(
                emitter,
                ctx,
                ForgeEvent::BeaconRegistered {
                    capability_type,
                    beacon,
                    previous,
                },
            );
            Ok(previous)
        })
    }

    // ===== Upgrades =====

    /// Direct path for a capability type beacon; returns the previous
    /// implementation
    pub fn upgrade_beacon(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        capability_type: CapabilityType,
        implementation: Address,
    ) -> ForgeResult<Address> {
        self.transact("upgrade_beacon", |state, _| {
            beacon::upgrade_direct(
                state,
                ctx,
                factory,
                BeaconTarget::Capability(capability_type),
                implementation,
            )
        })
    }

    /// Direct path for the kind beacon of a base factory
    pub fn upgrade_asset_beacon(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        implementation: Address,
    ) -> ForgeResult<Address> {
        self.transact("upgrade_asset_beacon", |state, _| {
            let kind = state
                .asset_factories
                .get(factory)
                .map(AssetFactory::kind)
                .ok_or_else(|| ForgeError::not_found(format!("asset factory {factory}")))?;
            beacon::upgrade_direct(state, ctx, factory, BeaconTarget::Asset(kind), implementation)
        })
    }

    /// Governed path
    pub fn propose_upgrade(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        target: BeaconTarget,
        implementation: Address,
    ) -> ForgeResult<Address> {
        self.transact("propose_upgrade", |state, collaborators| {
            beacon::propose_upgrade(state, collaborators, ctx, factory, target, implementation)
        })
    }

    // ===== Catalog =====

    pub fn register_factory(
        &mut self,
        ctx: &ExecutionContext,
        factory: Address,
        domain: FactoryDomain,
        version: &str,
        description: &str,
    ) -> ForgeResult<()> {
        self.transact("register_factory", |state, _| {
            state.catalog.register_factory(
                &ctx.caller,
                factory,
                domain,
                version,
                description,
                ctx.timestamp,
            )?;
            let emitter = *state.catalog.address();
            state.ledger.emit(
                emitter,
                ctx,
                ForgeEvent::FactoryRegistered {
                    factory,
                    domain,
                    version: version.to_string(),
                },
            );
            Ok(())
        })
    }

    pub fn deprecate_factory(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
    ) -> ForgeResult<bool> {
        self.transact("deprecate_factory", |state, _| {
            let changed = state.catalog.deprecate_factory(&ctx.caller, factory)?;
            if changed {
                let emitter = *state.catalog.address();
                state
                    .ledger
                    .emit(emitter, ctx, ForgeEvent::FactoryDeprecated { factory: *factory });
            }
            Ok(changed)
        })
    }

    pub fn activate_factory(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
    ) -> ForgeResult<bool> {
        self.transact("activate_factory", |state, _| {
            let changed = state.catalog.activate_factory(&ctx.caller, factory)?;
            if changed {
                let emitter = *state.catalog.address();
                state
                    .ledger
                    .emit(emitter, ctx, ForgeEvent::FactoryActivated { factory: *factory });
            }
            Ok(changed)
        })
    }

    pub fn set_latest_factory(
        &mut self,
        ctx: &ExecutionContext,
        domain: FactoryDomain,
        factory: &Address,
    ) -> ForgeResult<Option<Address>> {
        self.transact("set_latest_factory", |state, _| {
            let previous = state.catalog.set_latest_factory(&ctx.caller, domain, factory)?;
            let emitter = *state.catalog.address();
            state.ledger.emit(
                emitter,
                ctx,
                ForgeEvent::LatestFactorySet {
                    domain,
                    factory: *factory,
                },
            );
            Ok(previous)
        })
    }

    /// Self-attestation: `ctx.caller` must be the factory itself
    pub fn update_factory_stats(
        &mut self,
        ctx: &ExecutionContext,
        factory: &Address,
        stats: FactoryStats,
    ) -> ForgeResult<()> {
        self.transact("update_factory_stats", |state, _| {
            let total_deployments = stats.total_deployments;
            state
                .catalog
                .update_factory_stats(&ctx.caller, factory, stats)?;
            state.ledger.emit(
                *factory,
                ctx,
                ForgeEvent::FactoryStatsUpdated {
                    factory: *factory,
                    total_deployments,
                },
            );
            Ok(())
        })
    }

    // ===== Router =====

    pub fn resolve_extension_factory(&self, kind: AssetKind) -> ForgeResult<Address> {
        self.state.router.resolve(&self.state.catalog, kind)
    }

    pub fn attach_eligibility(
        &self,
        asset: &Address,
        kind: AssetKind,
        capability_type: CapabilityType,
    ) -> AttachEligibility {
        self.state.router.attach_eligibility(
            &self.state.catalog,
            &self.state.ledger,
            &self.state.registry,
            &self.state.extension_factories,
            asset,
            kind,
            capability_type,
        )
    }

    pub fn can_attach(
        &self,
        asset: &Address,
        kind: AssetKind,
        capability_type: CapabilityType,
    ) -> bool {
        self.attach_eligibility(asset, kind, capability_type).is_eligible()
    }

    // ===== Accessors =====

    pub fn admin(&self) -> &Address {
        self.state.registry.admin()
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.state.ledger
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.state.registry
    }

    pub fn catalog(&self) -> &FactoryCatalog {
        &self.state.catalog
    }

    pub fn router(&self) -> &ExtensionRouter {
        &self.state.router
    }

    pub fn asset_factory(&self, factory: &Address) -> Option<&AssetFactory> {
        self.state.asset_factories.get(factory)
    }

    pub fn extension_factory(&self, factory: &Address) -> Option<&CapabilityFactory> {
        self.state.extension_factories.get(factory)
    }

    pub fn asset_factories(&self) -> impl Iterator<Item = &AssetFactory> {
        self.state.asset_factories.values()
    }

    pub fn extension_factories(&self) -> impl Iterator<Item = &CapabilityFactory> {
        self.state.extension_factories.values()
    }

    /// Implementation an instance currently executes
    pub fn implementation_of(&self, address: &Address) -> ForgeResult<Address> {
        self.state.ledger.resolve_implementation(address)
    }

    pub fn events(&self) -> &[EventRecord] {
        self.state.ledger.events()
    }
}
