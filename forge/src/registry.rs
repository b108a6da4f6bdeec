//! Compatibility & Extension Registry
//!
//! Sole writer of capability instances, per-asset capability sets, base
//! asset records and the capability beacon table. Writes are restricted to
//! registrars (the deploying factories) and the admin.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use forge_common::{
    asset::AssetKind,
    capability::CapabilityType,
    compatibility::CompatibilityMatrix,
    crypto::Address,
    domain::DeploymentMode,
    error::{ForgeError, ForgeResult, InvalidParam},
    pagination::Page,
    time::TimestampSeconds,
    validation::validate_address,
};

/// One registered capability module instance.
/// Never deleted; only the `active` flag ever changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInstance {
    pub address: Address,
    pub asset: Address,
    pub capability_type: CapabilityType,
    pub kind: AssetKind,
    pub deployer: Address,
    pub factory: Address,
    pub deployed_at: TimestampSeconds,
    pub active: bool,
    pub version: String,
}

/// Capabilities attached to one asset
#[derive(Clone, Debug, Default)]
pub struct AssetCapabilitySet {
    capabilities: Vec<Address>,
    by_type: HashMap<CapabilityType, Address>,
    members: HashSet<Address>,
}

impl AssetCapabilitySet {
    /// Capability addresses in registration order
    pub fn capabilities(&self) -> &[Address] {
        &self.capabilities
    }

    pub fn get(&self, capability_type: CapabilityType) -> Option<&Address> {
        self.by_type.get(&capability_type)
    }

    pub fn contains(&self, capability: &Address) -> bool {
        self.members.contains(capability)
    }

    fn insert(&mut self, capability_type: CapabilityType, capability: Address) {
        self.capabilities.push(capability);
        self.by_type.insert(capability_type, capability);
        self.members.insert(capability);
    }
}

/// Base asset written when a base factory deploys an instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub asset: Address,
    pub kind: AssetKind,
    pub deployer: Address,
    pub factory: Address,
    pub mode: DeploymentMode,
    pub deployed_at: TimestampSeconds,
}

/// Input of [`ExtensionRegistry::register_capability`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityRegistration {
    pub capability: Address,
    pub asset: Address,
    pub capability_type: CapabilityType,
    pub kind: AssetKind,
    pub deployer: Address,
    pub factory: Address,
    pub timestamp: TimestampSeconds,
}

#[derive(Clone, Debug)]
pub struct ExtensionRegistry {
    address: Address,
    admin: Address,
    registrars: IndexSet<Address>,
    matrix: CompatibilityMatrix,
    version_tag: String,
    max_page_size: usize,

    instances: IndexMap<Address, CapabilityInstance>,
    asset_sets: IndexMap<Address, AssetCapabilitySet>,
    assets_by_kind: HashMap<AssetKind, Vec<Address>>,
    by_type: HashMap<CapabilityType, Vec<Address>>,
    by_deployer: HashMap<Address, Vec<Address>>,
    beacons: IndexMap<CapabilityType, Address>,
    base_assets: IndexMap<Address, AssetRecord>,
}

impl ExtensionRegistry {
    pub fn new(
        address: Address,
        admin: Address,
        matrix: CompatibilityMatrix,
        version_tag: String,
        max_page_size: usize,
    ) -> Self {
        Self {
            address,
            admin,
            registrars: IndexSet::new(),
            matrix,
            version_tag,
            max_page_size,
            instances: IndexMap::new(),
            asset_sets: IndexMap::new(),
            assets_by_kind: HashMap::new(),
            by_type: HashMap::new(),
            by_deployer: HashMap::new(),
            beacons: IndexMap::new(),
            base_assets: IndexMap::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    fn ensure_admin(&self, caller: &Address) -> ForgeResult<()> {
        if *caller != self.admin {
            return Err(ForgeError::Unauthorized(*caller));
        }
        Ok(())
    }

    fn ensure_registrar(&self, caller: &Address) -> ForgeResult<()> {
        if !self.registrars.contains(caller) {
            return Err(ForgeError::Unauthorized(*caller));
        }
        Ok(())
    }

    // ===== Roles =====

    /// Returns false if the account already was a registrar
    pub fn grant_registrar(&mut self, caller: &Address, account: Address) -> ForgeResult<bool> {
        self.ensure_admin(caller)?;
        validate_address(&account)?;
        Ok(self.registrars.insert(account))
    }

    /// Returns false if the account was not a registrar
    pub fn revoke_registrar(&mut self, caller: &Address, account: &Address) -> ForgeResult<bool> {
        self.ensure_admin(caller)?;
        Ok(self.registrars.shift_remove(account))
    }

    pub fn is_registrar(&self, account: &Address) -> bool {
        self.registrars.contains(account)
    }

    // ===== Writes =====

    /// Record a base asset deployed by a registrar factory
    pub fn register_asset(&mut self, caller: &Address, record: AssetRecord) -> ForgeResult<()> {
        self.ensure_registrar(caller)?;
        validate_address(&record.asset)?;
        if self.base_assets.contains_key(&record.asset) {
            return Err(ForgeError::already_registered(format!(
                "asset {}",
                record.asset
            )));
        }
        debug!("asset {} ({}) registered", record.asset, record.kind);
        self.base_assets.insert(record.asset, record);
        Ok(())
    }

    /// Register a capability instance against an asset.
    ///
    /// Checks run in a fixed order before anything is written: global
    /// address uniqueness, compatibility, recorded kind, then per-asset
    /// uniqueness of the type.
    pub fn register_capability(
        &mut self,
        caller: &Address,
        registration: CapabilityRegistration,
    ) -> ForgeResult<&CapabilityInstance> {
        self.ensure_registrar(caller)?;
        let CapabilityRegistration {
            capability,
            asset,
            capability_type,
            kind,
            deployer,
            factory,
            timestamp,
        } = registration;
        validate_address(&capability)?;
        validate_address(&asset)?;

        if self.instances.contains_key(&capability) {
            return Err(ForgeError::already_registered(format!(
                "capability {capability}"
            )));
        }

        if !self.matrix.is_compatible(kind, capability_type) {
            return Err(ForgeError::Incompatible {
                kind,
                capability_type,
            });
        }

        if let Some(record) = self.base_assets.get(&asset) {
            if record.kind != kind {
                return Err(InvalidParam::KindMismatch.into());
            }
        }

        if self
            .asset_sets
            .get(&asset)
            .is_some_and(|set| set.get(capability_type).is_some())
        {
            return Err(ForgeError::AlreadyAttached {
                asset,
                capability_type,
            });
        }

        let first_for_asset = !self.asset_sets.contains_key(&asset);
        self.asset_sets
            .entry(asset)
            .or_default()
            .insert(capability_type, capability);
        if first_for_asset {
            self.assets_by_kind.entry(kind).or_default().push(asset);
        }
        self.by_type.entry(capability_type).or_default().push(capability);
        self.by_deployer.entry(deployer).or_default().push(capability);

        if log::log_enabled!(log::Level::Info) {
            info!(
                "capability {} ({}) registered for asset {} by {}",
                capability, capability_type, asset, deployer
            );
        }

        let instance = CapabilityInstance {
            address: capability,
            asset,
            capability_type,
            kind,
            deployer,
            factory,
            deployed_at: timestamp,
            active: true,
            version: self.version_tag.clone(),
        };
        let instance = self.instances.entry(capability).or_insert(instance);
        Ok(&*instance)
    }

    fn set_active(
        &mut self,
        caller: &Address,
        capability: &Address,
        active: bool,
    ) -> ForgeResult<bool> {
        self.ensure_admin(caller)?;
        let instance = self
            .instances
            .get_mut(capability)
            .ok_or_else(|| ForgeError::not_found(format!("capability {capability}")))?;
        if instance.active == active {
            return Ok(false);
        }
        instance.active = active;
        Ok(true)
    }

    /// Returns false when the capability already was inactive
    pub fn deactivate_capability(
        &mut self,
        caller: &Address,
        capability: &Address,
    ) -> ForgeResult<bool> {
        self.set_active(caller, capability, false)
    }

    /// Returns false when the capability already was active
    pub fn reactivate_capability(
        &mut self,
        caller: &Address,
        capability: &Address,
    ) -> ForgeResult<bool> {
        self.set_active(caller, capability, true)
    }

    /// Set one compatibility cell, returning its previous value.
    /// Capabilities already registered for the pair are left as they are.
    pub fn set_compatibility(
        &mut self,
        caller: &Address,
        kind: AssetKind,
        capability_type: CapabilityType,
        compatible: bool,
    ) -> ForgeResult<bool> {
        self.ensure_admin(caller)?;
        Ok(self.matrix.set(kind, capability_type, compatible))
    }

    /// Record the beacon backing a capability type; one-time per type
    pub fn register_beacon(
        &mut self,
        caller: &Address,
        capability_type: CapabilityType,
        beacon: Address,
    ) -> ForgeResult<()> {
        if *caller != self.admin {
            self.ensure_registrar(caller)?;
        }
        validate_address(&beacon)?;
        if let Some(existing) = self.beacons.get(&capability_type) {
            return Err(ForgeError::already_registered(format!(
                "beacon {existing} for {capability_type}"
            )));
        }
        self.beacons.insert(capability_type, beacon);
        Ok(())
    }

    /// Explicitly re-point the beacon of a type, returning the previous one
    pub fn repoint_beacon(
        &mut self,
        caller: &Address,
        capability_type: CapabilityType,
        beacon: Address,
    ) -> ForgeResult<Option<Address>> {
        self.ensure_admin(caller)?;
        validate_address(&beacon)?;
        Ok(self.beacons.insert(capability_type, beacon))
    }

    // ===== Queries =====

    /// Capability addresses of an asset in registration order
    pub fn get_asset_capabilities(&self, asset: &Address) -> &[Address] {
        self.asset_sets
            .get(asset)
            .map(AssetCapabilitySet::capabilities)
            .unwrap_or_default()
    }

    pub fn asset_capability_set(&self, asset: &Address) -> Option<&AssetCapabilitySet> {
        self.asset_sets.get(asset)
    }

    pub fn get_capability_by_type(
        &self,
        asset: &Address,
        capability_type: CapabilityType,
    ) -> Option<Address> {
        self.asset_sets
            .get(asset)
            .and_then(|set| set.get(capability_type))
            .copied()
    }

    pub fn has_capability(&self, asset: &Address, capability_type: CapabilityType) -> bool {
        self.get_capability_by_type(asset, capability_type).is_some()
    }

    pub fn is_compatible(&self, kind: AssetKind, capability_type: CapabilityType) -> bool {
        self.matrix.is_compatible(kind, capability_type)
    }

    pub fn matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    pub fn get_instance(&self, capability: &Address) -> Option<&CapabilityInstance> {
        self.instances.get(capability)
    }

    pub fn is_registered(&self, capability: &Address) -> bool {
        self.instances.contains_key(capability)
    }

    pub fn capabilities_by_type(&self, capability_type: CapabilityType) -> &[Address] {
        self.by_type
            .get(&capability_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn capabilities_by_deployer(&self, deployer: &Address) -> &[Address] {
        self.by_deployer
            .get(deployer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn beacon_for(&self, capability_type: CapabilityType) -> Option<Address> {
        self.beacons.get(&capability_type).copied()
    }

    pub fn asset_record(&self, asset: &Address) -> Option<&AssetRecord> {
        self.base_assets.get(asset)
    }

    /// All capability instances in registration order
    pub fn all_capabilities(&self, page: Page) -> Vec<&CapabilityInstance> {
        let values: Vec<&CapabilityInstance> = self.instances.values().collect();
        page.slice(&values, self.max_page_size).to_vec()
    }

    /// Assets of a kind holding at least one capability, by first attachment
    pub fn assets_by_kind(&self, kind: AssetKind, page: Page) -> &[Address] {
        let assets = self
            .assets_by_kind
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default();
        page.slice(assets, self.max_page_size)
    }

    /// Assets holding at least one capability, by first attachment
    pub fn all_assets(&self, page: Page) -> Vec<Address> {
        let assets: Vec<Address> = self.asset_sets.keys().copied().collect();
        page.slice(&assets, self.max_page_size).to_vec()
    }

    /// Base assets in deployment order
    pub fn base_assets(&self, page: Page) -> Vec<&AssetRecord> {
        let values: Vec<&AssetRecord> = self.base_assets.values().collect();
        page.slice(&values, self.max_page_size).to_vec()
    }

    pub fn capability_count(&self) -> usize {
        self.instances.len()
    }

    pub fn asset_count(&self) -> usize {
        self.asset_sets.len()
    }

    pub fn base_asset_count(&self) -> usize {
        self.base_assets.len()
    }

    pub fn active_capability_count(&self) -> usize {
        self.instances.values().filter(|i| i.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Address {
        Address::from_label("admin")
    }

    fn factory() -> Address {
        Address::from_label("factory")
    }

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new(
            Address::system("registry"),
            admin(),
            CompatibilityMatrix::seeded(),
            "1.0.0".to_string(),
            100,
        );
        registry.grant_registrar(&admin(), factory()).unwrap();
        registry
    }

    fn registration(
        capability: &str,
        asset: &str,
        ty: CapabilityType,
        kind: AssetKind,
    ) -> CapabilityRegistration {
        CapabilityRegistration {
            capability: Address::from_label(capability),
            asset: Address::from_label(asset),
            capability_type: ty,
            kind,
            deployer: Address::from_label("alice"),
            factory: factory(),
            timestamp: 42,
        }
    }

    #[test]
    fn test_register_and_query() {
        let mut registry = registry();
        let asset = Address::from_label("t1");
        registry
            .register_capability(
                &factory(),
                registration("permit", "t1", CapabilityType::Permit, AssetKind::Fungible),
            )
            .unwrap();
        registry
            .register_capability(
                &factory(),
                registration("votes", "t1", CapabilityType::Votes, AssetKind::Fungible),
            )
            .unwrap();

        assert_eq!(
            registry.get_asset_capabilities(&asset),
            &[Address::from_label("permit"), Address::from_label("votes")]
        );
        assert_eq!(
            registry.get_capability_by_type(&asset, CapabilityType::Permit),
            Some(Address::from_label("permit"))
        );
        assert!(registry.has_capability(&asset, CapabilityType::Votes));
        assert!(!registry.has_capability(&asset, CapabilityType::Snapshot));
        assert_eq!(registry.assets_by_kind(AssetKind::Fungible, Page::default()), &[asset]);
        assert_eq!(registry.capabilities_by_type(CapabilityType::Permit).len(), 1);
        assert_eq!(registry.capabilities_by_deployer(&Address::from_label("alice")).len(), 2);
        assert_eq!(registry.all_assets(Page::default()), vec![asset]);
        let instance = registry.get_instance(&Address::from_label("votes")).unwrap();
        assert_eq!(instance.version, "1.0.0");
        assert!(instance.active);
    }

    #[test]
    fn test_check_order() {
        let mut registry = registry();
        registry
            .register_capability(
                &factory(),
                registration("permit", "t1", CapabilityType::Permit, AssetKind::Fungible),
            )
            .unwrap();

        // same capability address: global uniqueness wins over everything
        let err = registry
            .register_capability(
                &factory(),
                registration("permit", "t2", CapabilityType::Rental, AssetKind::Vault),
            )
            .unwrap_err();
        assert!(matches!(err, ForgeError::AlreadyRegistered(_)));

        // incompatible pair is reported before per-asset uniqueness
        let err = registry
            .register_capability(
                &factory(),
                registration("other", "t1", CapabilityType::Rental, AssetKind::Fungible),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ForgeError::Incompatible {
                kind: AssetKind::Fungible,
                capability_type: CapabilityType::Rental
            }
        );

        let err = registry
            .register_capability(
                &factory(),
                registration("permit2", "t1", CapabilityType::Permit, AssetKind::Fungible),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ForgeError::AlreadyAttached {
                asset: Address::from_label("t1"),
                capability_type: CapabilityType::Permit
            }
        );
        assert_eq!(registry.capability_count(), 1);
        assert!(!registry.is_registered(&Address::from_label("permit2")));
    }

    #[test]
    fn test_recorded_kind_must_match() {
        let mut registry = registry();
        registry
            .register_asset(
                &factory(),
                AssetRecord {
                    asset: Address::from_label("nft"),
                    kind: AssetKind::NonFungible,
                    deployer: Address::from_label("alice"),
                    factory: factory(),
                    mode: DeploymentMode::Clone,
                    deployed_at: 1,
                },
            )
            .unwrap();
        let err = registry
            .register_capability(
                &factory(),
                registration("votes", "nft", CapabilityType::Votes, AssetKind::Fungible),
            )
            .unwrap_err();
        assert_eq!(err, ForgeError::InvalidParameter(InvalidParam::KindMismatch));
    }

    #[test]
    fn test_only_registrars_write() {
        let mut registry = registry();
        let mallory = Address::from_label("mallory");
        let err = registry
            .register_capability(
                &mallory,
                registration("permit", "t1", CapabilityType::Permit, AssetKind::Fungible),
            )
            .unwrap_err();
        assert_eq!(err, ForgeError::Unauthorized(mallory));

        registry.revoke_registrar(&admin(), &factory()).unwrap();
        assert!(!registry.is_registrar(&factory()));
        assert!(registry
            .register_capability(
                &factory(),
                registration("permit", "t1", CapabilityType::Permit, AssetKind::Fungible),
            )
            .is_err());
    }

    #[test]
    fn test_deactivate_reactivate_only_flips_flag() {
        let mut registry = registry();
        let capability = Address::from_label("permit");
        registry
            .register_capability(
                &factory(),
                registration("permit", "t1", CapabilityType::Permit, AssetKind::Fungible),
            )
            .unwrap();
        let before = registry.get_instance(&capability).unwrap().clone();

        assert!(registry.deactivate_capability(&admin(), &capability).unwrap());
        assert!(!registry.deactivate_capability(&admin(), &capability).unwrap());
        assert!(!registry.get_instance(&capability).unwrap().active);
        assert_eq!(registry.active_capability_count(), 0);

        assert!(registry.reactivate_capability(&admin(), &capability).unwrap());
        assert_eq!(registry.get_instance(&capability).unwrap(), &before);

        assert!(matches!(
            registry.deactivate_capability(&admin(), &Address::from_label("unknown")),
            Err(ForgeError::NotFound(_))
        ));
        assert!(matches!(
            registry.deactivate_capability(&factory(), &capability),
            Err(ForgeError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_matrix_change_is_not_retroactive() {
        let mut registry = registry();
        registry
            .register_capability(
                &factory(),
                registration("permit", "t1", CapabilityType::Permit, AssetKind::Fungible),
            )
            .unwrap();
        assert!(registry
            .set_compatibility(&admin(), AssetKind::Fungible, CapabilityType::Permit, false)
            .unwrap());
        assert!(registry.has_capability(&Address::from_label("t1"), CapabilityType::Permit));
        assert!(registry.get_instance(&Address::from_label("permit")).unwrap().active);

        let err = registry
            .register_capability(
                &factory(),
                registration("permit-2", "t2", CapabilityType::Permit, AssetKind::Fungible),
            )
            .unwrap_err();
        assert!(matches!(err, ForgeError::Incompatible { .. }));
    }

    #[test]
    fn test_beacons_one_time_per_type() {
        let mut registry = registry();
        let beacon = Address::from_label("beacon");
        registry.register_beacon(&factory(), CapabilityType::Royalty, beacon).unwrap();
        assert!(matches!(
            registry.register_beacon(&admin(), CapabilityType::Royalty, Address::from_label("b2")),
            Err(ForgeError::AlreadyRegistered(_))
        ));
        assert!(matches!(
            registry.register_beacon(
                &Address::from_label("mallory"),
                CapabilityType::Rental,
                beacon
            ),
            Err(ForgeError::Unauthorized(_))
        ));
        assert_eq!(
            registry
                .repoint_beacon(&admin(), CapabilityType::Royalty, Address::from_label("b2"))
                .unwrap(),
            Some(beacon)
        );
        assert_eq!(
            registry.beacon_for(CapabilityType::Royalty),
            Some(Address::from_label("b2"))
        );
    }

    #[test]
    fn test_pagination_clamped() {
        let mut registry = ExtensionRegistry::new(
            Address::system("registry"),
            admin(),
            CompatibilityMatrix::seeded(),
            "1.0.0".to_string(),
            2,
        );
        registry.grant_registrar(&admin(), factory()).unwrap();
        for i in 0..5 {
            registry
                .register_capability(
                    &factory(),
                    registration(
                        &format!("c{i}"),
                        &format!("a{i}"),
                        CapabilityType::Permit,
                        AssetKind::Fungible,
                    ),
                )
                .unwrap();
        }
        assert_eq!(registry.all_capabilities(Page::new(0, 50)).len(), 2);
        assert_eq!(registry.all_capabilities(Page::new(4, 50)).len(), 1);
        assert_eq!(registry.all_assets(Page::new(1, 1)), vec![Address::from_label("a1")]);
    }
}
