use forge_common::{
    asset::{AssetKind, AssetParams},
    error::{ForgeError, ForgeResult, InvalidParam},
    validation::{self, ValidationResult},
};

/// Per-kind configuration of the generic asset factory
#[derive(Clone, Copy)]
pub struct KindProfile {
    pub kind: AssetKind,
    validate: fn(&AssetParams) -> ValidationResult,
    encode_init: fn(&AssetParams) -> ForgeResult<Vec<u8>>,
}

impl KindProfile {
    pub fn for_kind(kind: AssetKind) -> Self {
        PROFILES[kind.index()]
    }

    /// Check `params` are for this kind and pass its validator
    pub fn validate(&self, params: &AssetParams) -> ForgeResult<()> {
        if params.kind() != self.kind {
            return Err(InvalidParam::KindMismatch.into());
        }
        (self.validate)(params)?;
        Ok(())
    }

    /// Encode the initializer payload
    pub fn encode_init(&self, params: &AssetParams) -> ForgeResult<Vec<u8>> {
        (self.encode_init)(params)
    }
}

impl std::fmt::Debug for KindProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindProfile").field("kind", &self.kind).finish()
    }
}

fn validate_fungible(params: &AssetParams) -> ValidationResult {
    match params {
        AssetParams::Fungible(p) => validation::validate_fungible(p),
        _ => Err(InvalidParam::KindMismatch),
    }
}

fn validate_non_fungible(params: &AssetParams) -> ValidationResult {
    match params {
        AssetParams::NonFungible(p) => validation::validate_non_fungible(p),
        _ => Err(InvalidParam::KindMismatch),
    }
}

fn validate_multi_token(params: &AssetParams) -> ValidationResult {
    match params {
        AssetParams::MultiToken(p) => validation::validate_multi_token(p),
        _ => Err(InvalidParam::KindMismatch),
    }
}

fn validate_semi_fungible(params: &AssetParams) -> ValidationResult {
    match params {
        AssetParams::SemiFungible(p) => validation::validate_semi_fungible(p),
        _ => Err(InvalidParam::KindMismatch),
    }
}

fn validate_vault(params: &AssetParams) -> ValidationResult {
    match params {
        AssetParams::Vault(p) => validation::validate_vault(p),
        _ => Err(InvalidParam::KindMismatch),
    }
}

fn validate_partitioned_security(params: &AssetParams) -> ValidationResult {
    match params {
        AssetParams::PartitionedSecurity(p) => validation::validate_partitioned_security(p),
        _ => Err(InvalidParam::KindMismatch),
    }
}

fn encode_json(params: &AssetParams) -> ForgeResult<Vec<u8>> {
    serde_json::to_vec(params)
        .map_err(|e| ForgeError::InitializationFailed(format!("encoding parameters: {e}")))
}

const PROFILES: [KindProfile; 6] = [
    KindProfile {
        kind: AssetKind::Fungible,
        validate: validate_fungible,
        encode_init: encode_json,
    },
    KindProfile {
        kind: AssetKind::NonFungible,
        validate: validate_non_fungible,
        encode_init: encode_json,
    },
    KindProfile {
        kind: AssetKind::MultiToken,
        validate: validate_multi_token,
        encode_init: encode_json,
    },
    KindProfile {
        kind: AssetKind::SemiFungible,
        validate: validate_semi_fungible,
        encode_init: encode_json,
    },
    KindProfile {
        kind: AssetKind::Vault,
        validate: validate_vault,
        encode_init: encode_json,
    },
    KindProfile {
        kind: AssetKind::PartitionedSecurity,
        validate: validate_partitioned_security,
        encode_init: encode_json,
    },
];
