use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use forge_common::{
    crypto::Address,
    domain::DeploymentMode,
    pagination::Page,
    time::{BlockHeight, TimestampSeconds},
};

use crate::discovery::FactoryStats;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub address: Address,
    pub deployer: Address,
    pub mode: DeploymentMode,
    pub deployed_at: TimestampSeconds,
    pub block_height: BlockHeight,
}

/// Instances produced by one factory, in deployment order.
/// Only the owning factory writes it.
#[derive(Clone, Debug, Default)]
pub struct DeploymentRecord {
    instances: IndexMap<Address, InstanceRecord>,
    by_deployer: HashMap<Address, Vec<Address>>,
    total: u64,
}

impl DeploymentRecord {
    pub(crate) fn record(&mut self, instance: InstanceRecord) {
        self.by_deployer
            .entry(instance.deployer)
            .or_default()
            .push(instance.address);
        self.instances.insert(instance.address, instance);
        self.total += 1;
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.instances.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<&InstanceRecord> {
        self.instances.get(address)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn last(&self) -> Option<&InstanceRecord> {
        self.instances.last().map(|(_, record)| record)
    }

    /// Figures the factory attests about itself in the catalog
    pub fn stats(&self) -> FactoryStats {
        FactoryStats {
            total_deployments: self.total,
            last_deployment_at: self.last().map(|record| record.deployed_at),
        }
    }

    pub fn instances(&self, page: Page, max: usize) -> Vec<&InstanceRecord> {
        let values: Vec<&InstanceRecord> = self.instances.values().collect();
        page.slice(&values, max).to_vec()
    }

    pub fn by_deployer(&self, deployer: &Address) -> &[Address] {
        self.by_deployer
            .get(deployer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
