use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use forge_common::{crypto::Address, domain::BeaconTarget, time::TimestampSeconds};

/// Upgrade submitted through the governed path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeProposal {
    pub proposer: Address,
    pub factory: Address,
    pub beacon: Address,
    pub target: BeaconTarget,
    pub current_implementation: Address,
    pub new_implementation: Address,
    pub proposed_at: TimestampSeconds,
}

/// Separate authority deciding governed upgrades.
/// Only `Ok(true)` approves; errors are treated as a refusal.
pub trait UpgradeGovernance: Send + Sync {
    fn approve(&self, proposal: &UpgradeProposal) -> anyhow::Result<bool>;
}

/// Approves proposals made by any council member
#[derive(Clone, Debug, Default)]
pub struct CouncilGovernance {
    members: HashSet<Address>,
}

impl CouncilGovernance {
    pub fn new(members: impl IntoIterator<Item = Address>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn is_member(&self, account: &Address) -> bool {
        self.members.contains(account)
    }
}

impl UpgradeGovernance for CouncilGovernance {
    fn approve(&self, proposal: &UpgradeProposal) -> anyhow::Result<bool> {
        Ok(self.is_member(&proposal.proposer))
    }
}
