use serde::{Deserialize, Serialize};

use forge_common::{
    crypto::Address,
    time::{BlockHeight, TimestampSeconds},
};

/// Runtime values of the transaction an operation runs in.
///
/// Operations never read the wall clock; timestamps recorded in state are
/// always taken from here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub caller: Address,
    pub timestamp: TimestampSeconds,
    pub block_height: BlockHeight,
}

impl ExecutionContext {
    pub fn new(caller: Address, timestamp: TimestampSeconds, block_height: BlockHeight) -> Self {
        Self {
            caller,
            timestamp,
            block_height,
        }
    }

    /// Same transaction, seen from a nested call made by `caller`
    pub fn nested(&self, caller: Address) -> Self {
        Self { caller, ..*self }
    }
}
