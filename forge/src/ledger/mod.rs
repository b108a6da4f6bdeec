//! In-process host ledger.
//!
//! Provides exactly what the orchestration layer needs from its host:
//! accounts holding code, per-account storage, CREATE / CREATE2 style
//! address derivation, initializer calls through clones and beacon proxies,
//! and an append-only event log. Atomicity is provided one level up by
//! snapshotting the whole forge state.

mod code;

pub use code::*;

use std::{collections::HashMap, sync::Arc};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use forge_common::{
    crypto::{compute_contract_address, compute_deterministic_address, Address, Hash},
    error::{ForgeError, ForgeResult},
    event::ForgeEvent,
    time::{BlockHeight, TimestampSeconds},
    validation::validate_bytecode,
};

use crate::context::ExecutionContext;

#[derive(Clone, Debug)]
pub struct Account {
    pub code: AccountCode,
    pub storage: ContractStorage,
    pub created_at: TimestampSeconds,
}

/// One entry of the event log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub emitter: Address,
    pub block_height: BlockHeight,
    pub timestamp: TimestampSeconds,
    #[serde(flatten)]
    pub event: ForgeEvent,
}

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    accounts: HashMap<Address, Account>,
    nonces: HashMap<Address, u64>,
    events: Vec<EventRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Accounts =====

    pub fn has_code(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn code(&self, address: &Address) -> Option<&AccountCode> {
        self.accounts.get(address).map(|a| &a.code)
    }

    pub fn storage(&self, address: &Address) -> Option<&ContractStorage> {
        self.accounts.get(address).map(|a| &a.storage)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    /// Address the next `create` by `deployer` will use
    pub fn next_contract_address(&self, deployer: &Address) -> Address {
        compute_contract_address(deployer, self.nonce(deployer))
    }

    /// Place `code` at `address`, failing if anything already lives there
    pub fn insert_account(
        &mut self,
        address: Address,
        code: AccountCode,
        created_at: TimestampSeconds,
    ) -> ForgeResult<()> {
        if address.is_zero() || self.accounts.contains_key(&address) {
            return Err(ForgeError::AddressCollision(address));
        }
        trace!("account {} created ({})", address, code.label());
        self.accounts.insert(
            address,
            Account {
                code,
                storage: ContractStorage::new(),
                created_at,
            },
        );
        Ok(())
    }

    /// CREATE: address derived from the deployer nonce
    pub fn create(
        &mut self,
        deployer: &Address,
        code: AccountCode,
        created_at: TimestampSeconds,
    ) -> ForgeResult<Address> {
        let nonce = self.nonce(deployer);
        let address = compute_contract_address(deployer, nonce);
        self.insert_account(address, code, created_at)?;
        self.nonces.insert(*deployer, nonce + 1);
        Ok(address)
    }

    /// CREATE2: address derived from (deployer, salt, code hash)
    pub fn create2(
        &mut self,
        deployer: &Address,
        salt: &Hash,
        code_hash: &Hash,
        code: AccountCode,
        created_at: TimestampSeconds,
    ) -> ForgeResult<Address> {
        let address = compute_deterministic_address(deployer, salt, code_hash);
        self.insert_account(address, code, created_at)?;
        Ok(address)
    }

    /// Deploy implementation code
    pub fn deploy_code(
        &mut self,
        deployer: &Address,
        bytecode: Vec<u8>,
        logic: Arc<dyn ContractLogic>,
        created_at: TimestampSeconds,
    ) -> ForgeResult<Address> {
        validate_bytecode(&bytecode)?;
        let code = ContractCode::new(bytecode, logic);
        let address = self.create(
            deployer,
            AccountCode::Implementation(Arc::new(code)),
            created_at,
        )?;
        debug!("implementation deployed at {} by {}", address, deployer);
        Ok(address)
    }

    /// Code hash of an implementation account
    pub fn code_hash(&self, address: &Address) -> ForgeResult<Hash> {
        match self.code(address) {
            Some(AccountCode::Implementation(code)) => Ok(code.code_hash().clone()),
            _ => Err(ForgeError::NoCode(*address)),
        }
    }

    pub fn is_implementation(&self, address: &Address) -> bool {
        matches!(self.code(address), Some(AccountCode::Implementation(_)))
    }

    // ===== Beacons =====

    /// Current implementation and owner of a beacon
    pub fn beacon(&self, beacon: &Address) -> Option<(Address, Address)> {
        match self.code(beacon) {
            Some(AccountCode::Beacon {
                implementation,
                owner,
            }) => Some((*implementation, *owner)),
            _ => None,
        }
    }

    /// Create a beacon owned by `deployer`. The implementation must hold code.
    pub fn create_beacon(
        &mut self,
        deployer: &Address,
        implementation: Address,
        created_at: TimestampSeconds,
    ) -> ForgeResult<Address> {
        if !self.is_implementation(&implementation) {
            return Err(ForgeError::NoCode(implementation));
        }
        self.create(
            deployer,
            AccountCode::Beacon {
                implementation,
                owner: *deployer,
            },
            created_at,
        )
    }

    /// Swap the implementation of a beacon, returning the previous one.
    /// Only the beacon owner may do this; the pointer is untouched on error.
    pub fn set_beacon_implementation(
        &mut self,
        by: &Address,
        beacon: &Address,
        implementation: Address,
    ) -> ForgeResult<Address> {
        let (previous, owner) = self
            .beacon(beacon)
            .ok_or_else(|| ForgeError::not_found(format!("beacon {beacon}")))?;
        if owner != *by {
            return Err(ForgeError::Unauthorized(*by));
        }
        if !self.is_implementation(&implementation) {
            return Err(ForgeError::NoCode(implementation));
        }
        if let Some(account) = self.accounts.get_mut(beacon) {
            account.code = AccountCode::Beacon {
                implementation,
                owner,
            };
        }
        Ok(previous)
    }

    // ===== Calls =====

    /// Implementation account an address executes, following clones and
    /// beacon proxies
    pub fn resolve_implementation(&self, address: &Address) -> ForgeResult<Address> {
        match self.code(address) {
            Some(AccountCode::Implementation(_)) => Ok(*address),
            Some(AccountCode::Clone { master }) => Ok(*master),
            Some(AccountCode::BeaconProxy { beacon }) => self
                .beacon(beacon)
                .map(|(implementation, _)| implementation)
                .ok_or(ForgeError::NoCode(*beacon)),
            _ => Err(ForgeError::NoCode(*address)),
        }
    }

    fn resolve_code(&self, address: &Address) -> ForgeResult<Arc<ContractCode>> {
        let implementation = self.resolve_implementation(address)?;
        match self.code(&implementation) {
            Some(AccountCode::Implementation(code)) => Ok(code.clone()),
            _ => Err(ForgeError::NoCode(implementation)),
        }
    }

    /// Run the initializer of `target` against its own storage
    pub fn call_initialize(
        &mut self,
        ctx: &ExecutionContext,
        target: &Address,
        payload: &[u8],
    ) -> ForgeResult<()> {
        let code = self.resolve_code(target)?;
        let account = self
            .accounts
            .get_mut(target)
            .ok_or(ForgeError::NoCode(*target))?;

        code.logic()
            .initialize(&mut account.storage, target, ctx, payload)
            .map_err(|e| {
                debug!("initializer of {} failed: {:#}", target, e);
                ForgeError::InitializationFailed(format!("{e:#}"))
            })
    }

    // ===== Events =====

    pub fn emit(&mut self, emitter: Address, ctx: &ExecutionContext, event: ForgeEvent) {
        if log::log_enabled!(log::Level::Debug) {
            debug!("event {} from {}", event.name(), emitter);
        }
        self.events.push(EventRecord {
            emitter,
            block_height: ctx.block_height,
            timestamp: ctx.timestamp,
            event,
        });
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn events_since(&self, index: usize) -> &[EventRecord] {
        &self.events[index.min(self.events.len())..]
    }

    /// Move the event log out, leaving an empty one in place
    pub(crate) fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    /// Put back a log moved out with [`Ledger::take_events`]. Events emitted
    /// in the meantime follow it.
    pub(crate) fn restore_events(&mut self, mut log: Vec<EventRecord>) {
        log.append(&mut self.events);
        self.events = log;
    }
}
