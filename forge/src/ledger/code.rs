use std::{collections::BTreeMap, fmt, sync::Arc};

use forge_common::crypto::{hash, Address, Hash};

use crate::context::ExecutionContext;

/// Per-account key/value storage
pub type ContractStorage = BTreeMap<Vec<u8>, Vec<u8>>;

/// Behaviour attached to deployed implementation code.
///
/// Only the initializer is modelled: it runs against the storage of the
/// account being initialized (a clone or proxy), never the implementation's.
pub trait ContractLogic: Send + Sync {
    fn name(&self) -> &str;

    fn initialize(
        &self,
        storage: &mut ContractStorage,
        this: &Address,
        ctx: &ExecutionContext,
        payload: &[u8],
    ) -> anyhow::Result<()>;
}

/// Implementation code deployed at an account
#[derive(Clone)]
pub struct ContractCode {
    bytecode: Vec<u8>,
    code_hash: Hash,
    logic: Arc<dyn ContractLogic>,
}

impl ContractCode {
    pub fn new(bytecode: Vec<u8>, logic: Arc<dyn ContractLogic>) -> Self {
        let code_hash = hash(&bytecode);
        Self {
            bytecode,
            code_hash,
            logic,
        }
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn code_hash(&self) -> &Hash {
        &self.code_hash
    }

    pub fn logic(&self) -> &Arc<dyn ContractLogic> {
        &self.logic
    }
}

impl fmt::Debug for ContractCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractCode")
            .field("code_hash", &self.code_hash)
            .field("size", &self.bytecode.len())
            .field("logic", &self.logic.name())
            .finish()
    }
}

/// What lives at an account
#[derive(Clone, Debug)]
pub enum AccountCode {
    /// Implementation (master) code
    Implementation(Arc<ContractCode>),
    /// Minimal proxy forwarding to a fixed master
    Clone { master: Address },
    /// Proxy asking `beacon` for its implementation on every call
    BeaconProxy { beacon: Address },
    /// Upgrade pointer shared by a family of beacon proxies
    Beacon { implementation: Address, owner: Address },
    /// Built-in component (registry, catalog, router)
    System(String),
}

impl AccountCode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Implementation(_) => "implementation",
            Self::Clone { .. } => "clone",
            Self::BeaconProxy { .. } => "beacon-proxy",
            Self::Beacon { .. } => "beacon",
            Self::System(_) => "system",
        }
    }
}
