use serde::{Deserialize, Serialize};

use crate::crypto::Address;

use super::AssetKind;

/// Parameters for a fungible token (ERC20-style)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Minted to the owner at initialization
    #[serde(with = "super::amount")]
    pub initial_supply: u128,
    /// Hard cap on supply (None = uncapped)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::amount::option"
    )]
    pub max_supply: Option<u128>,
    pub owner: Address,
}

/// Parameters for a non-fungible collection (ERC721-style)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleParams {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub base_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_supply: Option<u64>,
    pub owner: Address,
}

/// Parameters for a multi-token (ERC1155-style)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTokenParams {
    pub name: String,
    pub uri: String,
    pub owner: Address,
}

/// Parameters for a semi-fungible value token (ERC3525-style)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemiFungibleParams {
    pub name: String,
    pub symbol: String,
    pub value_decimals: u8,
    pub owner: Address,
}

/// Parameters for a yield-bearing vault (ERC4626-style)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParams {
    pub name: String,
    pub symbol: String,
    /// Asset deposited into the vault
    pub underlying: Address,
    pub owner: Address,
}

/// Parameters for a partitioned security token (ERC1400-style)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionedSecurityParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Default partitions (tranches) the token starts with
    pub partitions: Vec<String>,
    /// Accounts allowed to force transfers / redemptions
    #[serde(default)]
    pub controllers: Vec<Address>,
    pub owner: Address,
}

/// Kind-specific initialization parameters of a base asset.
///
/// The variant decides which kind the parameters are for; a factory only
/// accepts the variant matching its own kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AssetParams {
    Fungible(FungibleParams),
    NonFungible(NonFungibleParams),
    MultiToken(MultiTokenParams),
    SemiFungible(SemiFungibleParams),
    Vault(VaultParams),
    PartitionedSecurity(PartitionedSecurityParams),
}

impl AssetParams {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Fungible(_) => AssetKind::Fungible,
            Self::NonFungible(_) => AssetKind::NonFungible,
            Self::MultiToken(_) => AssetKind::MultiToken,
            Self::SemiFungible(_) => AssetKind::SemiFungible,
            Self::Vault(_) => AssetKind::Vault,
            Self::PartitionedSecurity(_) => AssetKind::PartitionedSecurity,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Fungible(p) => &p.name,
            Self::NonFungible(p) => &p.name,
            Self::MultiToken(p) => &p.name,
            Self::SemiFungible(p) => &p.name,
            Self::Vault(p) => &p.name,
            Self::PartitionedSecurity(p) => &p.name,
        }
    }

    /// Multi-tokens carry no symbol
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Fungible(p) => Some(&p.symbol),
            Self::NonFungible(p) => Some(&p.symbol),
            Self::MultiToken(_) => None,
            Self::SemiFungible(p) => Some(&p.symbol),
            Self::Vault(p) => Some(&p.symbol),
            Self::PartitionedSecurity(p) => Some(&p.symbol),
        }
    }

    pub fn owner(&self) -> &Address {
        match self {
            Self::Fungible(p) => &p.owner,
            Self::NonFungible(p) => &p.owner,
            Self::MultiToken(p) => &p.owner,
            Self::SemiFungible(p) => &p.owner,
            Self::Vault(p) => &p.owner,
            Self::PartitionedSecurity(p) => &p.owner,
        }
    }
}
