//! Discovery registries: the versioned factory catalog and the router
//! resolving an asset kind to its extension factory.

pub mod router;

pub use router::*;

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use forge_common::{
    crypto::Address,
    domain::FactoryDomain,
    error::{ForgeError, ForgeResult, InvalidParam},
    pagination::Page,
    time::TimestampSeconds,
    validation::{parse_version, validate_address, validate_description},
};

/// Usage figures a factory reports about itself
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryStats {
    pub total_deployments: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployment_at: Option<TimestampSeconds>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryRecord {
    pub address: Address,
    pub domain: FactoryDomain,
    /// Version as registered (may carry a leading `v`)
    pub version: String,
    #[serde(skip)]
    semver: Option<semver::Version>,
    pub registered_at: TimestampSeconds,
    pub active: bool,
    pub deprecated: bool,
    pub description: String,
    pub stats: FactoryStats,
}

impl FactoryRecord {
    pub fn semver(&self) -> Option<&semver::Version> {
        self.semver.as_ref()
    }

    /// Listed as usable
    pub fn is_live(&self) -> bool {
        self.active && !self.deprecated
    }
}

#[derive(Clone, Debug)]
pub struct FactoryCatalog {
    address: Address,
    admin: Address,
    max_page_size: usize,
    records: IndexMap<Address, FactoryRecord>,
    // normalized version -> factory, per domain
    versions: HashMap<FactoryDomain, IndexMap<String, Address>>,
    latest: HashMap<FactoryDomain, Address>,
}

impl FactoryCatalog {
    pub fn new(address: Address, admin: Address, max_page_size: usize) -> Self {
        Self {
            address,
            admin,
            max_page_size,
            records: IndexMap::new(),
            versions: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    fn ensure_admin(&self, caller: &Address) -> ForgeResult<()> {
        if *caller != self.admin {
            return Err(ForgeError::Unauthorized(*caller));
        }
        Ok(())
    }

    fn record_mut(&mut self, factory: &Address) -> ForgeResult<&mut FactoryRecord> {
        self.records
            .get_mut(factory)
            .ok_or_else(|| ForgeError::not_found(format!("factory {factory}")))
    }

    /// Catalogue a factory under `domain` and make it the latest of the domain
    pub fn register_factory(
        &mut self,
        caller: &Address,
        address: Address,
        domain: FactoryDomain,
        version: &str,
        description: &str,
        registered_at: TimestampSeconds,
    ) -> ForgeResult<&FactoryRecord> {
        self.ensure_admin(caller)?;
        validate_address(&address)?;
        validate_description(description)?;
        let parsed = parse_version(version)?;
        let key = parsed.to_string();

        if self.records.contains_key(&address) {
            return Err(ForgeError::already_registered(format!("factory {address}")));
        }
        if self
            .versions
            .get(&domain)
            .is_some_and(|versions| versions.contains_key(&key))
        {
            return Err(ForgeError::already_registered(format!(
                "version {version} in {domain}"
            )));
        }

        self.versions.entry(domain).or_default().insert(key, address);
        self.latest.insert(domain, address);
        info!("factory {} registered as {} {}", address, domain, version);

        let record = FactoryRecord {
            address,
            domain,
            version: version.to_string(),
            semver: Some(parsed),
            registered_at,
            active: true,
            deprecated: false,
            description: description.to_string(),
            stats: FactoryStats::default(),
        };
        let record = self.records.entry(address).or_insert(record);
        Ok(&*record)
    }

    /// Returns false if already deprecated
    pub fn deprecate_factory(&mut self, caller: &Address, factory: &Address) -> ForgeResult<bool> {
        self.ensure_admin(caller)?;
        let record = self.record_mut(factory)?;
        if record.deprecated {
            return Ok(false);
        }
        record.deprecated = true;
        record.active = false;
        Ok(true)
    }

    /// Returns false if already active
    pub fn activate_factory(&mut self, caller: &Address, factory: &Address) -> ForgeResult<bool> {
        self.ensure_admin(caller)?;
        let record = self.record_mut(factory)?;
        if record.is_live() {
            return Ok(false);
        }
        record.deprecated = false;
        record.active = true;
        Ok(true)
    }

    /// Override the latest pointer of a domain, returning the previous one
    pub fn set_latest_factory(
        &mut self,
        caller: &Address,
        domain: FactoryDomain,
        factory: &Address,
    ) -> ForgeResult<Option<Address>> {
        self.ensure_admin(caller)?;
        let record = self
            .records
            .get(factory)
            .ok_or_else(|| ForgeError::not_found(format!("factory {factory}")))?;
        if record.domain != domain {
            return Err(InvalidParam::KindMismatch.into());
        }
        Ok(self.latest.insert(domain, *factory))
    }

    /// Self-attestation: only the factory may describe itself
    pub fn update_factory_stats(
        &mut self,
        caller: &Address,
        factory: &Address,
        stats: FactoryStats,
    ) -> ForgeResult<()> {
        if caller != factory {
            return Err(ForgeError::Unauthorized(*caller));
        }
        let record = self.record_mut(factory)?;
        debug!(
            "factory {} reports {} deployments",
            factory, stats.total_deployments
        );
        record.stats = stats;
        Ok(())
    }

    // ===== Queries =====

    pub fn get_factory(&self, factory: &Address) -> Option<&FactoryRecord> {
        self.records.get(factory)
    }

    pub fn is_catalogued(&self, factory: &Address) -> bool {
        self.records.contains_key(factory)
    }

    pub fn get_latest_factory(&self, domain: FactoryDomain) -> Option<&FactoryRecord> {
        self.latest
            .get(&domain)
            .and_then(|address| self.records.get(address))
    }

    /// Exact version lookup; `v1.0.0` and `1.0.0` name the same version
    pub fn get_factory_by_version(
        &self,
        domain: FactoryDomain,
        version: &str,
    ) -> Option<&FactoryRecord> {
        let key = parse_version(version).ok()?.to_string();
        self.versions
            .get(&domain)?
            .get(&key)
            .and_then(|address| self.records.get(address))
    }

    /// Every factory of a domain in registration order, deprecated included
    pub fn get_factories_by_domain(&self, domain: FactoryDomain) -> Vec<&FactoryRecord> {
        self.versions
            .get(&domain)
            .map(|versions| {
                versions
                    .values()
                    .filter_map(|address| self.records.get(address))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn active_factories(&self, domain: FactoryDomain) -> Vec<&FactoryRecord> {
        self.get_factories_by_domain(domain)
            .into_iter()
            .filter(|record| record.is_live())
            .collect()
    }

    pub fn all_factories(&self, page: Page) -> Vec<&FactoryRecord> {
        let values: Vec<&FactoryRecord> = self.records.values().collect();
        page.slice(&values, self.max_page_size).to_vec()
    }

    pub fn factory_count(&self) -> usize {
        self.records.len()
    }
}
