//! Compatibility Matrix
//!
//! Boolean table of which capability types are legal on which asset kinds.
//! Consulted once, at registration time; flipping a cell never touches
//! capabilities already registered for that pair.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

use crate::{asset::AssetKind, capability::CapabilityType};

lazy_static! {
    /// Matrix seeded from the default target kinds of every capability type
    pub static ref DEFAULT_COMPATIBILITY: CompatibilityMatrix = CompatibilityMatrix::seeded();
}

/// One explicit cell assignment, used for genesis overrides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityOverride {
    pub kind: AssetKind,
    pub capability_type: CapabilityType,
    pub compatible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompatibilityMatrix {
    cells: Vec<bool>,
}

impl CompatibilityMatrix {
    /// Matrix with every pair forbidden
    pub fn empty() -> Self {
        Self {
            cells: vec![false; AssetKind::COUNT * CapabilityType::COUNT],
        }
    }

    /// Matrix holding the default pairs
    pub fn seeded() -> Self {
        let mut matrix = Self::empty();
        for capability_type in CapabilityType::iter() {
            for kind in capability_type.default_kinds() {
                matrix.set(*kind, capability_type, true);
            }
        }
        matrix
    }

    #[inline]
    fn slot(kind: AssetKind, capability_type: CapabilityType) -> usize {
        kind.index() * CapabilityType::COUNT + capability_type.index()
    }

    pub fn is_compatible(&self, kind: AssetKind, capability_type: CapabilityType) -> bool {
        self.cells[Self::slot(kind, capability_type)]
    }

    /// Set one cell, returning its previous value
    pub fn set(
        &mut self,
        kind: AssetKind,
        capability_type: CapabilityType,
        compatible: bool,
    ) -> bool {
        let slot = Self::slot(kind, capability_type);
        std::mem::replace(&mut self.cells[slot], compatible)
    }

    pub fn apply(&mut self, overrides: &[CompatibilityOverride]) {
        for o in overrides {
            self.set(o.kind, o.capability_type, o.compatible);
        }
    }

    /// Capability types currently legal on `kind`
    pub fn compatible_types(&self, kind: AssetKind) -> Vec<CapabilityType> {
        CapabilityType::iter()
            .filter(|ty| self.is_compatible(kind, *ty))
            .collect()
    }

    /// Number of allowed pairs
    pub fn allowed_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }
}

impl Default for CompatibilityMatrix {
    fn default() -> Self {
        DEFAULT_COMPATIBILITY.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_matches_defaults() {
        let matrix = CompatibilityMatrix::default();
        for ty in CapabilityType::iter() {
            for kind in AssetKind::iter() {
                assert_eq!(
                    matrix.is_compatible(kind, ty),
                    ty.targets_by_default(kind),
                    "({kind}, {ty})"
                );
            }
        }
        assert!(matrix.is_compatible(AssetKind::Fungible, CapabilityType::Permit));
        assert!(!matrix.is_compatible(AssetKind::Vault, CapabilityType::Permit));
    }

    #[test]
    fn test_set_returns_previous() {
        let mut matrix = CompatibilityMatrix::seeded();
        let before = matrix.allowed_count();
        assert!(!matrix.set(AssetKind::Vault, CapabilityType::Pausable, true));
        assert!(matrix.is_compatible(AssetKind::Vault, CapabilityType::Pausable));
        assert_eq!(matrix.allowed_count(), before + 1);
        assert!(matrix.set(AssetKind::Vault, CapabilityType::Pausable, false));
        assert_eq!(matrix.allowed_count(), before);
    }

    #[test]
    fn test_overrides() {
        let mut matrix = CompatibilityMatrix::seeded();
        matrix.apply(&[CompatibilityOverride {
            kind: AssetKind::Fungible,
            capability_type: CapabilityType::Permit,
            compatible: false,
        }]);
        assert!(!matrix.is_compatible(AssetKind::Fungible, CapabilityType::Permit));
        assert!(!matrix
            .compatible_types(AssetKind::Fungible)
            .contains(&CapabilityType::Permit));
        assert!(CompatibilityMatrix::empty()
            .compatible_types(AssetKind::Vault)
            .is_empty());
    }
}
