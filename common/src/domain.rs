use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{asset::AssetKind, capability::CapabilityType};

/// How an asset instance was created
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeploymentMode {
    /// Minimal proxy of the master, address from the factory nonce
    Clone,
    /// Minimal proxy at a salt-derived address
    Deterministic,
    /// Proxy resolving its implementation through the kind beacon
    Beacon,
}

/// Catalog domain of a factory.
///
/// Versions are unique within a domain and each domain has its own
/// "latest" pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "domain", content = "key", rename_all = "kebab-case")]
pub enum FactoryDomain {
    /// Base asset factory for a kind
    Base(AssetKind),
    /// Extension (capability) factory for a kind
    Extension(AssetKind),
    /// Standalone factory of one capability type
    Capability(CapabilityType),
}

impl fmt::Display for FactoryDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(kind) => write!(f, "base/{kind}"),
            Self::Extension(kind) => write!(f, "extension/{kind}"),
            Self::Capability(ty) => write!(f, "capability/{ty}"),
        }
    }
}

/// Family of proxies sharing one beacon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", content = "key", rename_all = "kebab-case")]
pub enum BeaconTarget {
    /// Beacon proxies of base assets of a kind
    Asset(AssetKind),
    /// Capability instances of one type
    Capability(CapabilityType),
}

impl fmt::Display for BeaconTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset(kind) => write!(f, "asset/{kind}"),
            Self::Capability(ty) => write!(f, "capability/{ty}"),
        }
    }
}
