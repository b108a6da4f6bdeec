//! Capability Module Catalogue
//!
//! Closed set of attachable capability modules. Each type knows the asset
//! kinds it targets by default; those pairs seed the compatibility matrix.
//! The business logic of the modules themselves lives elsewhere: this crate
//! only names them and carries their opaque configuration.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

use crate::asset::AssetKind;
use crate::asset::AssetKind::*;

/// Attachable capability module types
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
pub enum CapabilityType {
    // ===== Fungible =====
    /// Signature-based approvals
    Permit = 0,
    /// Balance snapshots for dividends / governance
    Snapshot,
    /// Flash minting
    FlashMint,
    /// Supply cap enforcement
    Capped,
    /// Transfer fee strategy
    FeeOnTransfer,
    /// Linear / cliff vesting schedules
    Vesting,

    // ===== Shared =====
    /// Vote delegation and checkpoints
    Votes,
    /// Holder-initiated burning
    Burnable,
    /// Emergency stop of transfers
    Pausable,
    /// Allow-list / jurisdiction compliance gating
    Compliance,
    /// Secondary sale royalties
    Royalty,
    /// Per-token URI overrides
    UriStorage,
    /// Non-transferable tokens
    Soulbound,

    // ===== Non-fungible =====
    /// Time-boxed user rights (rentals)
    Rental,
    /// On-chain enumeration
    Enumerable,
    /// Batch consecutive minting
    Consecutive,

    // ===== Multi-token =====
    /// Per-id supply tracking
    SupplyTracking,
    /// Batch metadata updates
    BatchMetadata,

    // ===== Semi-fungible =====
    /// Slot enumeration
    SlotEnumerable,
    /// Slot-level approvals
    SlotApprovable,
    /// Value allowances between token ids
    ValueAllowance,

    // ===== Vault =====
    /// Deposit / withdrawal fee strategy
    FeeStrategy,
    /// Per-account and global deposit limits
    DepositLimit,
    /// Queued withdrawals
    WithdrawalQueue,
    /// Yield routing to external strategies
    YieldStrategy,
    /// Delayed administrative actions
    Timelock,

    // ===== Partitioned security =====
    /// Legal document attachment
    DocumentManagement,
    /// Forced transfers / redemptions
    ControllerOperations,
    /// Issuance windows and limits
    IssuanceControl,
    /// Investor identity registry
    InvestorRegistry,
}

impl CapabilityType {
    /// Column index in the compatibility matrix
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Asset kinds this capability is legal on out of the box
    pub fn default_kinds(self) -> &'static [AssetKind] {
        match self {
            Self::Permit
            | Self::Snapshot
            | Self::FlashMint
            | Self::Capped
            | Self::FeeOnTransfer
            | Self::Vesting => &[Fungible],
            Self::Votes => &[Fungible, NonFungible],
            Self::Burnable => &[Fungible, NonFungible, MultiToken],
            Self::Pausable => &[Fungible, NonFungible, MultiToken, SemiFungible],
            Self::Compliance => &[Fungible, PartitionedSecurity],
            Self::Royalty => &[NonFungible, MultiToken, SemiFungible],
            Self::UriStorage => &[NonFungible, MultiToken],
            Self::Soulbound => &[NonFungible, SemiFungible],
            Self::Rental | Self::Enumerable | Self::Consecutive => &[NonFungible],
            Self::SupplyTracking | Self::BatchMetadata => &[MultiToken],
            Self::SlotEnumerable | Self::SlotApprovable | Self::ValueAllowance => &[SemiFungible],
            Self::FeeStrategy
            | Self::DepositLimit
            | Self::WithdrawalQueue
            | Self::YieldStrategy
            | Self::Timelock => &[Vault],
            Self::DocumentManagement
            | Self::ControllerOperations
            | Self::IssuanceControl
            | Self::InvestorRegistry => &[PartitionedSecurity],
        }
    }

    pub fn targets_by_default(self, kind: AssetKind) -> bool {
        self.default_kinds().contains(&kind)
    }
}

/// Module-specific configuration handed to a capability initializer.
///
/// Opaque to the orchestration layer; only its encoded size is checked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityParams(pub serde_json::Value);

impl CapabilityParams {
    pub fn empty() -> Self {
        Self(serde_json::Value::Null)
    }

    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(&self.0).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}
