//! Parameter Validation
//!
//! Stateless checks shared by every factory and the catalog. Each check
//! returns the precise [`InvalidParam`] that failed; callers lift it into
//! `ForgeError::InvalidParameter` with `?`.

use std::collections::HashSet;

use crate::{
    asset::{
        AssetParams, FungibleParams, MultiTokenParams, NonFungibleParams,
        PartitionedSecurityParams, SemiFungibleParams, VaultParams,
    },
    capability::CapabilityParams,
    config::{
        MAX_CAPABILITY_PARAMS_SIZE, MAX_CONTROLLERS, MAX_DECIMALS, MAX_DESCRIPTION_LENGTH,
        MAX_NAME_LENGTH, MAX_PARTITIONS, MAX_PARTITION_NAME_LENGTH, MAX_SYMBOL_LENGTH,
        MAX_URI_LENGTH, MAX_VERSION_LENGTH,
    },
    crypto::Address,
    error::InvalidParam,
};

pub type ValidationResult = Result<(), InvalidParam>;

/// Validate asset name
pub fn validate_name(name: &str) -> ValidationResult {
    if name.trim().is_empty() {
        return Err(InvalidParam::NameEmpty);
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(InvalidParam::NameTooLong);
    }
    Ok(())
}

/// Validate asset symbol
pub fn validate_symbol(symbol: &str) -> ValidationResult {
    if symbol.is_empty() {
        return Err(InvalidParam::SymbolEmpty);
    }
    if symbol.len() > MAX_SYMBOL_LENGTH {
        return Err(InvalidParam::SymbolTooLong);
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(InvalidParam::SymbolInvalid);
    }
    Ok(())
}

pub fn validate_owner(owner: &Address) -> ValidationResult {
    if owner.is_zero() {
        return Err(InvalidParam::ZeroOwner);
    }
    Ok(())
}

pub fn validate_address(address: &Address) -> ValidationResult {
    if address.is_zero() {
        return Err(InvalidParam::ZeroAddress);
    }
    Ok(())
}

pub fn validate_decimals(decimals: u8) -> ValidationResult {
    if decimals > MAX_DECIMALS {
        return Err(InvalidParam::DecimalsTooHigh);
    }
    Ok(())
}

/// Validate an optional cap against the supply minted at initialization
pub fn validate_supply(initial_supply: u128, max_supply: Option<u128>) -> ValidationResult {
    if let Some(cap) = max_supply {
        if cap == 0 {
            return Err(InvalidParam::ZeroCap);
        }
        if initial_supply > cap {
            return Err(InvalidParam::SupplyExceedsCap);
        }
    }
    Ok(())
}

/// Validate a base or metadata URI (empty allowed)
pub fn validate_uri(uri: &str) -> ValidationResult {
    if uri.len() > MAX_URI_LENGTH {
        return Err(InvalidParam::UriTooLong);
    }
    Ok(())
}

pub fn validate_description(description: &str) -> ValidationResult {
    if description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(InvalidParam::DescriptionTooLong);
    }
    Ok(())
}

pub fn validate_partitions(partitions: &[String]) -> ValidationResult {
    if partitions.is_empty() {
        return Err(InvalidParam::EmptyPartitions);
    }
    if partitions.len() > MAX_PARTITIONS {
        return Err(InvalidParam::TooManyPartitions);
    }
    let mut seen = HashSet::with_capacity(partitions.len());
    for partition in partitions {
        if partition.trim().is_empty() || partition.len() > MAX_PARTITION_NAME_LENGTH {
            return Err(InvalidParam::PartitionInvalid);
        }
        if !seen.insert(partition.as_str()) {
            return Err(InvalidParam::DuplicatePartition);
        }
    }
    Ok(())
}

pub fn validate_controllers(controllers: &[Address]) -> ValidationResult {
    if controllers.len() > MAX_CONTROLLERS {
        return Err(InvalidParam::TooManyControllers);
    }
    controllers.iter().try_for_each(validate_address)
}

pub fn validate_capability_params(params: &CapabilityParams) -> ValidationResult {
    if params.encoded_len() > MAX_CAPABILITY_PARAMS_SIZE {
        return Err(InvalidParam::ParamsTooLarge);
    }
    Ok(())
}

/// Parse a semantic version string, accepting an optional leading `v`
pub fn parse_version(version: &str) -> Result<semver::Version, InvalidParam> {
    if version.is_empty() || version.len() > MAX_VERSION_LENGTH {
        return Err(InvalidParam::InvalidVersion);
    }
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(trimmed).map_err(|_| InvalidParam::InvalidVersion)
}

pub fn validate_version(version: &str) -> ValidationResult {
    parse_version(version).map(|_| ())
}

pub fn validate_bytecode(bytecode: &[u8]) -> ValidationResult {
    if bytecode.is_empty() {
        return Err(InvalidParam::EmptyBytecode);
    }
    Ok(())
}

fn validate_named(name: &str, symbol: &str, owner: &Address) -> ValidationResult {
    validate_name(name)?;
    validate_symbol(symbol)?;
    validate_owner(owner)
}

pub fn validate_fungible(params: &FungibleParams) -> ValidationResult {
    validate_named(&params.name, &params.symbol, &params.owner)?;
    validate_decimals(params.decimals)?;
    validate_supply(params.initial_supply, params.max_supply)
}

pub fn validate_non_fungible(params: &NonFungibleParams) -> ValidationResult {
    validate_named(&params.name, &params.symbol, &params.owner)?;
    validate_uri(&params.base_uri)?;
    if params.max_supply == Some(0) {
        return Err(InvalidParam::ZeroCap);
    }
    Ok(())
}

pub fn validate_multi_token(params: &MultiTokenParams) -> ValidationResult {
    validate_name(&params.name)?;
    validate_uri(&params.uri)?;
    validate_owner(&params.owner)
}

pub fn validate_semi_fungible(params: &SemiFungibleParams) -> ValidationResult {
    validate_named(&params.name, &params.symbol, &params.owner)?;
    validate_decimals(params.value_decimals)
}

pub fn validate_vault(params: &VaultParams) -> ValidationResult {
    validate_named(&params.name, &params.symbol, &params.owner)?;
    validate_address(&params.underlying)
}

pub fn validate_partitioned_security(params: &PartitionedSecurityParams) -> ValidationResult {
    validate_named(&params.name, &params.symbol, &params.owner)?;
    validate_decimals(params.decimals)?;
    validate_partitions(&params.partitions)?;
    validate_controllers(&params.controllers)
}

/// Validate parameters of any kind
pub fn validate_asset_params(params: &AssetParams) -> ValidationResult {
    match params {
        AssetParams::Fungible(p) => validate_fungible(p),
        AssetParams::NonFungible(p) => validate_non_fungible(p),
        AssetParams::MultiToken(p) => validate_multi_token(p),
        AssetParams::SemiFungible(p) => validate_semi_fungible(p),
        AssetParams::Vault(p) => validate_vault(p),
        AssetParams::PartitionedSecurity(p) => validate_partitioned_security(p),
    }
}
