//! Beacon upgrade layer.
//!
//! A beacon is a ledger account holding the implementation a family of
//! proxies resolves to. Beacons are owned by the factory that created them;
//! the factory's owner upgrades them directly, or a governance collaborator
//! approves upgrades proposed through the governed path.

mod governance;

pub use governance::*;

use std::{fmt::Display, hash::Hash};

use indexmap::IndexMap;
use log::{info, warn};
use metrics::counter;

use forge_common::{
    crypto::Address,
    domain::BeaconTarget,
    error::{ForgeError, ForgeResult},
    event::ForgeEvent,
};

use crate::{
    context::ExecutionContext,
    state::{Collaborators, ForgeState},
};

/// `{key -> beacon}` map, one beacon per key
#[derive(Clone, Debug)]
pub struct BeaconSet<K: Eq + Hash> {
    beacons: IndexMap<K, Address>,
}

impl<K: Eq + Hash> Default for BeaconSet<K> {
    fn default() -> Self {
        Self {
            beacons: IndexMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + Display> BeaconSet<K> {
    pub fn get(&self, key: &K) -> Option<Address> {
        self.beacons.get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.beacons.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: K, beacon: Address) -> ForgeResult<()> {
        if let Some(existing) = self.beacons.get(&key) {
            return Err(ForgeError::already_registered(format!(
                "beacon {existing} for {key}"
            )));
        }
        self.beacons.insert(key, beacon);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Address)> {
        self.beacons.iter()
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }
}

/// Beacon of one family together with the account allowed to upgrade it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeaconHandle {
    pub factory: Address,
    pub owner: Address,
    pub beacon: Address,
}

/// Create a beacon owned by `factory`
pub(crate) fn create_beacon(
    state: &mut ForgeState,
    ctx: &ExecutionContext,
    factory: Address,
    owner: Address,
    target: BeaconTarget,
    implementation: Address,
) -> ForgeResult<Address> {
    let beacon = state
        .ledger
        .create_beacon(&factory, implementation, ctx.timestamp)?;
    state.ledger.emit(
        factory,
        ctx,
        ForgeEvent::BeaconCreated {
            beacon,
            target,
            implementation,
            owner,
        },
    );
    info!("beacon {} created for {} -> {}", beacon, target, implementation);
    Ok(beacon)
}

/// Find the beacon `factory` holds for `target`
pub(crate) fn locate_beacon(
    state: &ForgeState,
    factory: &Address,
    target: BeaconTarget,
) -> ForgeResult<BeaconHandle> {
    match target {
        BeaconTarget::Asset(kind) => {
            let base = state
                .asset_factories
                .get(factory)
                .filter(|f| f.kind() == kind)
                .ok_or_else(|| ForgeError::not_found(format!("{kind} factory {factory}")))?;
            let beacon = base
                .beacon()
                .ok_or_else(|| ForgeError::not_configured(format!("beacon of {target}")))?;
            Ok(BeaconHandle {
                factory: *factory,
                owner: *base.owner(),
                beacon,
            })
        }
        BeaconTarget::Capability(capability_type) => {
            let extension = state
                .extension_factories
                .get(factory)
                .ok_or_else(|| ForgeError::not_found(format!("extension factory {factory}")))?;
            let beacon = extension
                .beacon(capability_type)
                .ok_or_else(|| ForgeError::not_configured(format!("beacon of {target}")))?;
            Ok(BeaconHandle {
                factory: *factory,
                owner: *extension.owner(),
                beacon,
            })
        }
    }
}

fn apply_upgrade(
    state: &mut ForgeState,
    ctx: &ExecutionContext,
    handle: BeaconHandle,
    target: BeaconTarget,
    implementation: Address,
) -> ForgeResult<Address> {
    let previous = state.ledger.set_beacon_implementation(
        &handle.factory,
        &handle.beacon,
        implementation,
    )?;
    state.ledger.emit(
        handle.factory,
        ctx,
        ForgeEvent::BeaconUpgraded {
            beacon: handle.beacon,
            target,
            previous,
            implementation,
            by: ctx.caller,
        },
    );
    counter!("forge_beacon_upgrades", "target" => target.to_string()).increment(1);
    if log::log_enabled!(log::Level::Info) {
        info!(
            "beacon {} ({}) upgraded {} -> {} by {}",
            handle.beacon, target, previous, implementation, ctx.caller
        );
    }
    Ok(previous)
}

/// Direct path: the factory owner swaps the implementation in one step
pub(crate) fn upgrade_direct(
    state: &mut ForgeState,
    ctx: &ExecutionContext,
    factory: &Address,
    target: BeaconTarget,
    implementation: Address,
) -> ForgeResult<Address> {
    let handle = locate_beacon(state, factory, target)?;
    if ctx.caller != handle.owner {
        return Err(ForgeError::Unauthorized(ctx.caller));
    }
    apply_upgrade(state, ctx, handle, target, implementation)
}

/// Governed path: the proposal is routed to the governance collaborator.
/// Without one, only the owner may upgrade and the path behaves as direct.
pub(crate) fn propose_upgrade(
    state: &mut ForgeState,
    collaborators: &Collaborators,
    ctx: &ExecutionContext,
    factory: &Address,
    target: BeaconTarget,
    implementation: Address,
) -> ForgeResult<Address> {
    let handle = locate_beacon(state, factory, target)?;
    let Some(governance) = &collaborators.governance else {
        if ctx.caller != handle.owner {
            return Err(ForgeError::Unauthorized(ctx.caller));
        }
        return apply_upgrade(state, ctx, handle, target, implementation);
    };

    let (current_implementation, _) = state
        .ledger
        .beacon(&handle.beacon)
        .ok_or(ForgeError::NoCode(handle.beacon))?;
    let proposal = UpgradeProposal {
        proposer: ctx.caller,
        factory: *factory,
        beacon: handle.beacon,
        target,
        current_implementation,
        new_implementation: implementation,
        proposed_at: ctx.timestamp,
    };

    match governance.approve(&proposal) {
        Ok(true) => {}
        Ok(false) => {
            return Err(ForgeError::PolicyRejected(format!(
                "upgrade of {target} to {implementation} declined by governance"
            )))
        }
        Err(e) => {
            warn!("governance failed on upgrade of {}: {:#}", target, e);
            return Err(ForgeError::PolicyRejected(format!(
                "upgrade of {target}: governance error: {e}"
            )));
        }
    }

    state.ledger.emit(
        handle.factory,
        ctx,
        ForgeEvent::UpgradeApproved {
            beacon: handle.beacon,
            target,
            implementation,
            proposer: ctx.caller,
        },
    );
    apply_upgrade(state, ctx, handle, target, implementation)
}
