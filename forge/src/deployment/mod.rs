//! Deployment Core
//!
//! One generic asset factory per kind, configured by a [`KindProfile`].
//! A factory places instances of its master implementation as clones,
//! deterministic clones or beacon proxies, initializes them and hands them
//! to the registry. Everything runs inside the caller's atomic unit, so a
//! failure at any step also discards the freshly created account.

mod profile;
mod record;

pub use profile::*;
pub use record::*;

use std::sync::Arc;

use log::info;
use metrics::counter;

use forge_common::{
    asset::{AssetKind, AssetParams},
    capability::{CapabilityParams, CapabilityType},
    crypto::{compute_deterministic_address, Address, Hash},
    domain::{BeaconTarget, DeploymentMode},
    error::{ForgeError, ForgeResult},
    event::ForgeEvent,
};

use crate::{
    beacon,
    capability,
    context::ExecutionContext,
    ledger::{AccountCode, ContractLogic},
    policy::PolicyRequest,
    registry::AssetRecord,
    state::{Collaborators, ForgeState},
};

/// Where a new instance is placed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    Clone,
    Deterministic { salt: Hash },
    Beacon,
}

impl Placement {
    pub fn mode(&self) -> DeploymentMode {
        match self {
            Self::Clone => DeploymentMode::Clone,
            Self::Deterministic { .. } => DeploymentMode::Deterministic,
            Self::Beacon => DeploymentMode::Beacon,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AssetFactory {
    address: Address,
    owner: Address,
    master: Address,
    beacon: Option<Address>,
    profile: KindProfile,
    record: DeploymentRecord,
}

impl AssetFactory {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn kind(&self) -> AssetKind {
        self.profile.kind
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn master_implementation(&self) -> &Address {
        &self.master
    }

    pub fn beacon(&self) -> Option<Address> {
        self.beacon
    }

    pub fn profile(&self) -> &KindProfile {
        &self.profile
    }

    pub fn record(&self) -> &DeploymentRecord {
        &self.record
    }

    pub fn is_instance(&self, address: &Address) -> bool {
        self.record.contains(address)
    }
}

fn factory<'a>(state: &'a ForgeState, address: &Address) -> ForgeResult<&'a AssetFactory> {
    state
        .asset_factories
        .get(address)
        .ok_or_else(|| ForgeError::not_found(format!("asset factory {address}")))
}

/// Admin-only: deploy a master implementation and the factory around it
pub(crate) fn create_asset_factory(
    state: &mut ForgeState,
    ctx: &ExecutionContext,
    kind: AssetKind,
    bytecode: Vec<u8>,
    logic: Arc<dyn ContractLogic>,
) -> ForgeResult<Address> {
    if ctx.caller != *state.registry.admin() {
        return Err(ForgeError::Unauthorized(ctx.caller));
    }

    let address = state.ledger.create(
        &ctx.caller,
        AccountCode::System(format!("asset-factory/{kind}")),
        ctx.timestamp,
    )?;
    let master = state
        .ledger
        .deploy_code(&address, bytecode, logic, ctx.timestamp)?;
    let code_hash = state.ledger.code_hash(&master)?;

    state.registry.grant_registrar(&ctx.caller, address)?;
    state.asset_factories.insert(
        address,
        AssetFactory {
            address,
            owner: ctx.caller,
            master,
            beacon: None,
            profile: KindProfile::for_kind(kind),
            record: DeploymentRecord::default(),
        },
    );

    state.ledger.emit(
        address,
        ctx,
        ForgeEvent::ImplementationDeployed {
            implementation: master,
            code_hash,
            deployer: address,
        },
    );
    state.ledger.emit(
        address,
        ctx,
        ForgeEvent::AssetFactoryCreated {
            factory: address,
            kind,
            master,
            owner: ctx.caller,
        },
    );
    info!("{} asset factory {} created, master {}", kind, address, master);
    Ok(address)
}

/// Owner-only, one-time: create the kind beacon pointing at the master
pub(crate) fn initialize_asset_beacon(
    state: &mut ForgeState,
    ctx: &ExecutionContext,
    address: &Address,
) -> ForgeResult<Address> {
    let base = factory(state, address)?;
    if ctx.caller != base.owner {
        return Err(ForgeError::Unauthorized(ctx.caller));
    }
    if let Some(existing) = base.beacon {
        return Err(ForgeError::already_registered(format!(
            "beacon {existing} of factory {address}"
        )));
    }
    let (kind, owner, master) = (base.kind(), base.owner, base.master);

    let beacon = beacon::create_beacon(
        state,
        ctx,
        *address,
        owner,
        BeaconTarget::Asset(kind),
        master,
    )?;
    if let Some(base) = state.asset_factories.get_mut(address) {
        base.beacon = Some(beacon);
    }
    Ok(beacon)
}

/// Address a deterministic deployment with `salt` will produce
pub(crate) fn predict_address(
    state: &ForgeState,
    address: &Address,
    salt: &Hash,
) -> ForgeResult<Address> {
    let base = factory(state, address)?;
    let code_hash = state.ledger.code_hash(&base.master)?;
    Ok(compute_deterministic_address(address, salt, &code_hash))
}

/// Validate, place, initialize, gate and register one asset instance
pub(crate) fn deploy(
    state: &mut ForgeState,
    collaborators: &Collaborators,
    ctx: &ExecutionContext,
    address: &Address,
    placement: Placement,
    params: &AssetParams,
) -> ForgeResult<Address> {
    let base = factory(state, address)?;
    let (kind, master, kind_beacon, profile) =
        (base.kind(), base.master, base.beacon, base.profile);
    let mode = placement.mode();

    profile.validate(params)?;
    let payload = profile.encode_init(params)?;

    let asset = match placement {
        Placement::Clone => state.ledger.create(
            address,
            AccountCode::Clone { master },
            ctx.timestamp,
        )?,
        Placement::Deterministic { salt } => {
            let code_hash = state.ledger.code_hash(&master)?;
            state.ledger.create2(
                address,
                &salt,
                &code_hash,
                AccountCode::Clone { master },
                ctx.timestamp,
            )?
        }
        Placement::Beacon => {
            let beacon = kind_beacon.ok_or_else(|| {
                ForgeError::not_configured(format!("beacon of {kind} factory {address}"))
            })?;
            state.ledger.create(
                address,
                AccountCode::BeaconProxy { beacon },
                ctx.timestamp,
            )?
        }
    };

    state
        .ledger
        .call_initialize(&ctx.nested(*address), &asset, &payload)?;

    collaborators.policy.enforce(&PolicyRequest::AssetDeployment {
        factory: *address,
        asset,
        kind,
        deployer: ctx.caller,
        mode,
    })?;

    state.registry.register_asset(
        address,
        AssetRecord {
            asset,
            kind,
            deployer: ctx.caller,
            factory: *address,
            mode,
            deployed_at: ctx.timestamp,
        },
    )?;

    let stats = match state.asset_factories.get_mut(address) {
        Some(base) => {
            base.record.record(InstanceRecord {
                address: asset,
                deployer: ctx.caller,
                mode,
                deployed_at: ctx.timestamp,
                block_height: ctx.block_height,
            });
            base.record.stats()
        }
        None => return Err(ForgeError::not_found(format!("asset factory {address}"))),
    };
    state.attest_stats(ctx, address, stats)?;

    state.ledger.emit(
        *address,
        ctx,
        ForgeEvent::AssetDeployed {
            asset,
            kind,
            factory: *address,
            deployer: ctx.caller,
            mode,
        },
    );
    counter!("forge_assets_deployed", "kind" => kind.to_string(), "mode" => mode.to_string())
        .increment(1);
    if log::log_enabled!(log::Level::Info) {
        info!(
            "{} asset {} deployed by {} ({})",
            kind, asset, ctx.caller, mode
        );
    }
    Ok(asset)
}

/// Delegate an attachment to the extension factory the router resolves
/// for this factory's kind
pub(crate) fn attach_capability(
    state: &mut ForgeState,
    collaborators: &Collaborators,
    ctx: &ExecutionContext,
    address: &Address,
    asset: &Address,
    capability_type: CapabilityType,
    params: &CapabilityParams,
) -> ForgeResult<Address> {
    let kind = factory(state, address)?.kind();
    let extension = state.router.resolve(&state.catalog, kind)?;
    capability::deploy_capability(
        state,
        collaborators,
        ctx,
        &extension,
        asset,
        capability_type,
        params,
    )
}
