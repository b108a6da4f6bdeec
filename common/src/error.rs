//! Forge Error Codes
//!
//! Range: 0x0300 - 0x03FF
//! Format: FORGE_ERROR_<CATEGORY>
//!
//! Every failure aborts the enclosing operation as a whole; the error only
//! tells the caller *why*. Codes are stable and travel with events/logs.

use thiserror::Error;

use crate::{asset::AssetKind, capability::CapabilityType, crypto::Address};

// ===== Taxonomy (0x0300 - 0x030F) =====

pub const FORGE_ERROR_INVALID_PARAMETER: u64 = 0x0300;
pub const FORGE_ERROR_NOT_CONFIGURED: u64 = 0x0301;
pub const FORGE_ERROR_ALREADY_REGISTERED: u64 = 0x0302;
pub const FORGE_ERROR_ALREADY_ATTACHED: u64 = 0x0303;
pub const FORGE_ERROR_INCOMPATIBLE: u64 = 0x0304;
pub const FORGE_ERROR_POLICY_REJECTED: u64 = 0x0305;
pub const FORGE_ERROR_NOT_FOUND: u64 = 0x0306;
pub const FORGE_ERROR_UNAUTHORIZED: u64 = 0x0307;

// ===== Host errors (0x0310 - 0x031F) =====

pub const FORGE_ERROR_ADDRESS_COLLISION: u64 = 0x0310;
pub const FORGE_ERROR_NO_CODE: u64 = 0x0311;
pub const FORGE_ERROR_INITIALIZATION_FAILED: u64 = 0x0312;

/// Forge operation result type
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Which parameter check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidParam {
    #[error("name cannot be empty")]
    NameEmpty,
    #[error("name too long")]
    NameTooLong,
    #[error("symbol cannot be empty")]
    SymbolEmpty,
    #[error("symbol too long")]
    SymbolTooLong,
    #[error("symbol must be uppercase ASCII letters or digits")]
    SymbolInvalid,
    #[error("owner cannot be the zero address")]
    ZeroOwner,
    #[error("address cannot be zero")]
    ZeroAddress,
    #[error("decimals too high")]
    DecimalsTooHigh,
    #[error("initial supply exceeds max supply")]
    SupplyExceedsCap,
    #[error("max supply cannot be zero")]
    ZeroCap,
    #[error("URI too long")]
    UriTooLong,
    #[error("description too long")]
    DescriptionTooLong,
    #[error("at least one partition is required")]
    EmptyPartitions,
    #[error("too many partitions")]
    TooManyPartitions,
    #[error("partition name invalid")]
    PartitionInvalid,
    #[error("duplicate partition")]
    DuplicatePartition,
    #[error("too many controllers")]
    TooManyControllers,
    #[error("capability parameters too large")]
    ParamsTooLarge,
    #[error("version is not a semantic version")]
    InvalidVersion,
    #[error("parameters do not match the asset kind")]
    KindMismatch,
    #[error("bytecode cannot be empty")]
    EmptyBytecode,
    #[error("page size out of range")]
    InvalidPageSize,
}

/// Typed failure reason of a forge operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] InvalidParam),

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    #[error("capability {capability_type} already attached to asset {asset}")]
    AlreadyAttached {
        asset: Address,
        capability_type: CapabilityType,
    },

    #[error("capability {capability_type} is not compatible with {kind} assets")]
    Incompatible {
        kind: AssetKind,
        capability_type: CapabilityType,
    },

    #[error("policy rejected: {0}")]
    PolicyRejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized caller {0}")]
    Unauthorized(Address),

    #[error("address {0} is already in use")]
    AddressCollision(Address),

    #[error("no code deployed at {0}")]
    NoCode(Address),

    #[error("initialization failed: {0}")]
    InitializationFailed(String),
}

impl ForgeError {
    /// Convert error to u64 error code
    pub fn code(&self) -> u64 {
        match self {
            Self::InvalidParameter(_) => FORGE_ERROR_INVALID_PARAMETER,
            Self::NotConfigured(_) => FORGE_ERROR_NOT_CONFIGURED,
            Self::AlreadyRegistered(_) => FORGE_ERROR_ALREADY_REGISTERED,
            Self::AlreadyAttached { .. } => FORGE_ERROR_ALREADY_ATTACHED,
            Self::Incompatible { .. } => FORGE_ERROR_INCOMPATIBLE,
            Self::PolicyRejected(_) => FORGE_ERROR_POLICY_REJECTED,
            Self::NotFound(_) => FORGE_ERROR_NOT_FOUND,
            Self::Unauthorized(_) => FORGE_ERROR_UNAUTHORIZED,
            Self::AddressCollision(_) => FORGE_ERROR_ADDRESS_COLLISION,
            Self::NoCode(_) => FORGE_ERROR_NO_CODE,
            Self::InitializationFailed(_) => FORGE_ERROR_INITIALIZATION_FAILED,
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn not_configured(what: impl std::fmt::Display) -> Self {
        Self::NotConfigured(what.to_string())
    }

    pub fn already_registered(what: impl std::fmt::Display) -> Self {
        Self::AlreadyRegistered(what.to_string())
    }
}
