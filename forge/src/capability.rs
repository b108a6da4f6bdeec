//! Capability (extension) factories.
//!
//! One factory per asset kind. It owns a beacon per capability type it
//! serves and deploys capability instances as beacon proxies of that
//! beacon, registering each with the extension registry.

use std::sync::Arc;

use log::{debug, info};
use metrics::counter;

use forge_common::{
    asset::AssetKind,
    capability::{CapabilityParams, CapabilityType},
    crypto::Address,
    domain::{BeaconTarget, DeploymentMode},
    error::{ForgeError, ForgeResult, InvalidParam},
    event::ForgeEvent,
    validation::{validate_address, validate_capability_params},
};

use crate::{
    beacon::{self, BeaconSet},
    context::ExecutionContext,
    deployment::{DeploymentRecord, InstanceRecord},
    ledger::{AccountCode, ContractLogic, Ledger},
    logic::{CapabilityInit, CapabilityLogic},
    policy::PolicyRequest,
    registry::{CapabilityRegistration, ExtensionRegistry},
    state::{Collaborators, ForgeState},
};

#[derive(Clone, Debug)]
pub struct CapabilityFactory {
    address: Address,
    kind: AssetKind,
    owner: Address,
    beacons: BeaconSet<CapabilityType>,
    record: DeploymentRecord,
}

impl CapabilityFactory {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn beacon(&self, capability_type: CapabilityType) -> Option<Address> {
        self.beacons.get(&capability_type)
    }

    pub fn beacons(&self) -> &BeaconSet<CapabilityType> {
        &self.beacons
    }

    pub fn record(&self) -> &DeploymentRecord {
        &self.record
    }
}

/// Implementation code for one capability type, as handed to
/// [`initialize_beacons`]
#[derive(Clone)]
pub struct ModuleImplementation {
    pub capability_type: CapabilityType,
    pub bytecode: Vec<u8>,
    pub logic: Arc<dyn ContractLogic>,
}

impl ModuleImplementation {
    /// Bytecode backed by the default capability initializer
    pub fn new(capability_type: CapabilityType, bytecode: Vec<u8>) -> Self {
        Self {
            capability_type,
            bytecode,
            logic: Arc::new(CapabilityLogic::new(capability_type)),
        }
    }
}

fn factory<'a>(state: &'a ForgeState, address: &Address) -> ForgeResult<&'a CapabilityFactory> {
    state
        .extension_factories
        .get(address)
        .ok_or_else(|| ForgeError::not_found(format!("extension factory {address}")))
}

/// A capability may only target a base asset of `kind` recorded by a base
/// factory. Beacons, proxies of other capabilities and system accounts
/// all have code but are not assets.
pub fn check_attach_target(
    ledger: &Ledger,
    registry: &ExtensionRegistry,
    asset: &Address,
    kind: AssetKind,
) -> ForgeResult<()> {
    if !ledger.has_code(asset) {
        return Err(ForgeError::NoCode(*asset));
    }
    let record = registry
        .asset_record(asset)
        .ok_or_else(|| ForgeError::not_found(format!("asset {asset}")))?;
    if record.kind != kind {
        return Err(InvalidParam::KindMismatch.into());
    }
    Ok(())
}

/// Admin-only: create the extension factory of a kind
pub(crate) fn create_extension_factory(
    state: &mut ForgeState,
    ctx: &ExecutionContext,
    kind: AssetKind,
) -> ForgeResult<Address> {
    if ctx.caller != *state.registry.admin() {
        return Err(ForgeError::Unauthorized(ctx.caller));
    }
    let address = state.ledger.create(
        &ctx.caller,
        AccountCode::System(format!("extension-factory/{kind}")),
        ctx.timestamp,
    )?;
    state.registry.grant_registrar(&ctx.caller, address)?;
    state.extension_factories.insert(
        address,
        CapabilityFactory {
            address,
            kind,
            owner: ctx.caller,
            beacons: BeaconSet::default(),
            record: DeploymentRecord::default(),
        },
    );
    state.ledger.emit(
        address,
        ctx,
        ForgeEvent::ExtensionFactoryCreated {
            factory: address,
            kind,
            owner: ctx.caller,
        },
    );
    info!("{} extension factory {} created", kind, address);
    Ok(address)
}

/// Owner-only: deploy one implementation per type and create its beacon
pub(crate) fn initialize_beacons(
    state: &mut ForgeState,
    ctx: &ExecutionContext,
    address: &Address,
    modules: Vec<ModuleImplementation>,
) -> ForgeResult<Vec<Address>> {
    let extension = factory(state, address)?;
    if ctx.caller != extension.owner {
        return Err(ForgeError::Unauthorized(ctx.caller));
    }
    let (kind, owner) = (extension.kind, extension.owner);

    let mut created = Vec::with_capacity(modules.len());
    for module in modules {
        let capability_type = module.capability_type;
        if !state.registry.is_compatible(kind, capability_type) {
            return Err(ForgeError::Incompatible {
                kind,
                capability_type,
            });
        }
        if let Some(existing) = state
            .extension_factories
            .get(address)
            .and_then(|f| f.beacon(capability_type))
        {
            return Err(ForgeError::already_registered(format!(
                "beacon {existing} for {capability_type}"
            )));
        }

        let implementation = state.ledger.deploy_code(
            address,
            module.bytecode,
            module.logic,
            ctx.timestamp,
        )?;
        let code_hash = state.ledger.code_hash(&implementation)?;
        state.ledger.emit(
            *address,
            ctx,
            ForgeEvent::ImplementationDeployed {
                implementation,
                code_hash,
                deployer: *address,
            },
        );

        let beacon = beacon::create_beacon(
            state,
            ctx,
            *address,
            owner,
            BeaconTarget::Capability(capability_type),
            implementation,
        )?;
        // the registry keeps the first beacon of a type until the admin re-points it
        match state.registry.beacon_for(capability_type) {
            Some(registered) => {
                debug!(
                    "{} keeps registered beacon {} for {}",
                    capability_type, registered, address
                );
            }
            None => {
                state
                    .registry
                    .register_beacon(address, capability_type, beacon)?;
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
            }
        }
        if let Some(extension) = state.extension_factories.get_mut(address) {
            extension.beacons.insert(capability_type, beacon)?;
        }
        created.push(beacon);
    }
    Ok(created)
}

/// Deploy a capability instance for `asset` and register it
pub(crate) fn deploy_capability(
    state: &mut ForgeState,
    collaborators: &Collaborators,
    ctx: &ExecutionContext,
    address: &Address,
    asset: &Address,
    capability_type: CapabilityType,
    params: &CapabilityParams,
) -> ForgeResult<Address> {
    let extension = factory(state, address)?;
    let kind = extension.kind;
    let type_beacon = extension.beacon(capability_type);

    validate_address(asset)?;
    validate_capability_params(params)?;
    check_attach_target(&state.ledger, &state.registry, asset, kind)?;
    let beacon = type_beacon.ok_or_else(|| {
        ForgeError::not_configured(format!("beacon of {capability_type} in factory {address}"))
    })?;

    collaborators
        .policy
        .enforce(&PolicyRequest::CapabilityAttachment {
            factory: *address,
            asset: *asset,
            kind,
            capability_type,
            deployer: ctx.caller,
        })?;

    let capability = state.ledger.create(
        address,
        AccountCode::BeaconProxy { beacon },
        ctx.timestamp,
    )?;
    let payload = serde_json::to_vec(&CapabilityInit {
        asset: *asset,
        capability_type,
        params: params.clone(),
    })
    .map_err(|e| ForgeError::InitializationFailed(format!("encoding capability init: {e}")))?;

    // the module is fully initialized before it becomes visible in the registry
    state
        .ledger
        .call_initialize(&ctx.nested(*address), &capability, &payload)?;

    state.registry.register_capability(
        address,
        CapabilityRegistration {
            capability,
            asset: *asset,
            capability_type,
            kind,
            deployer: ctx.caller,
            factory: *address,
            timestamp: ctx.timestamp,
        },
    )?;
    let registry_address = *state.registry.address();
    state.ledger.emit(
        registry_address,
        ctx,
        ForgeEvent::CapabilityRegistered {
            capability,
            asset: *asset,
            capability_type,
            kind,
        },
    );

    let stats = match state.extension_factories.get_mut(address) {
        Some(extension) => {
            extension.record.record(InstanceRecord {
                address: capability,
                deployer: ctx.caller,
                mode: DeploymentMode::Beacon,
                deployed_at: ctx.timestamp,
                block_height: ctx.block_height,
            });
            extension.record.stats()
        }
        None => return Err(ForgeError::not_found(format!("extension factory {address}"))),
    };
    state.attest_stats(ctx, address, stats)?;

    state.ledger.emit(
        *address,
        ctx,
        ForgeEvent::CapabilityDeployed {
            capability,
            asset: *asset,
            capability_type,
            factory: *address,
            deployer: ctx.caller,
        },
    );
    counter!("forge_capabilities_attached", "type" => capability_type.to_string()).increment(1);
    if log::log_enabled!(log::Level::Info) {
        info!(
            "capability {} ({}) attached to {} by {}",
            capability, capability_type, asset, ctx.caller
        );
    }
    Ok(capability)
}
