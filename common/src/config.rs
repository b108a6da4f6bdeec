pub const VERSION: &str = env!("BUILD_VERSION");

// ===== Asset Limits =====

/// Maximum length of asset name (bytes)
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum length of asset symbol/ticker (bytes)
pub const MAX_SYMBOL_LENGTH: usize = 12;

/// Maximum decimals for an asset
pub const MAX_DECIMALS: u8 = 18;

/// Maximum base/metadata URI length (bytes)
pub const MAX_URI_LENGTH: usize = 512;

/// Maximum partitions a security token starts with
pub const MAX_PARTITIONS: usize = 16;

/// Maximum length of a partition name (bytes)
pub const MAX_PARTITION_NAME_LENGTH: usize = 32;

/// Maximum controllers of a security token
pub const MAX_CONTROLLERS: usize = 16;

// ===== Capability Limits =====

/// Maximum serialized size of capability parameters (bytes)
pub const MAX_CAPABILITY_PARAMS_SIZE: usize = 4096;

/// Placeholder version tag stamped on every capability instance.
/// Not derived from the deployed implementation.
pub const DEFAULT_CAPABILITY_VERSION_TAG: &str = "1.0.0";

// ===== Catalog Limits =====

/// Maximum factory description length (bytes)
pub const MAX_DESCRIPTION_LENGTH: usize = 256;

/// Maximum version string length (bytes)
pub const MAX_VERSION_LENGTH: usize = 64;

// ===== Queries =====

/// Default page size of paginated listings
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Hard cap on a single page
pub const MAX_PAGE_SIZE: usize = 500;

// ===== System accounts =====

/// Label of the extension registry system account
pub const REGISTRY_ACCOUNT_LABEL: &str = "extension-registry";

/// Label of the factory catalog system account
pub const CATALOG_ACCOUNT_LABEL: &str = "factory-catalog";

/// Label of the extension router system account
pub const ROUTER_ACCOUNT_LABEL: &str = "extension-router";
