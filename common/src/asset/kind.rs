use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// Base asset categories a factory can instantiate.
///
/// The set is closed: adding a kind means shipping a new version of this
/// enum together with its profile, matrix row and default capabilities.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    EnumCount,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum AssetKind {
    /// ERC20-style fungible token
    Fungible = 0,
    /// ERC721-style non-fungible token
    NonFungible = 1,
    /// ERC1155-style multi-token
    MultiToken = 2,
    /// ERC3525-style semi-fungible value token
    SemiFungible = 3,
    /// ERC4626-style yield-bearing vault
    Vault = 4,
    /// ERC1400-style partitioned security token
    PartitionedSecurity = 5,
}

impl AssetKind {
    /// Row index in the compatibility matrix
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Conventional standard name, used in event payloads and logs
    pub const fn standard(self) -> &'static str {
        match self {
            Self::Fungible => "ERC20",
            Self::NonFungible => "ERC721",
            Self::MultiToken => "ERC1155",
            Self::SemiFungible => "ERC3525",
            Self::Vault => "ERC4626",
            Self::PartitionedSecurity => "ERC1400",
        }
    }
}
