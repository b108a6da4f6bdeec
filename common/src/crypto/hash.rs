use blake3::hash as blake3_hash;
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryInto,
    fmt::{Display, Error, Formatter},
    hash::Hasher,
    str::FromStr,
};

use super::Address;

pub const HASH_SIZE: usize = 32; // 32 bytes / 256 bits

/// Prefix byte for nonce-based (CREATE-style) address derivation
pub const CREATE_PREFIX: u8 = 0xfe;

/// Prefix byte for salt-based (CREATE2-style) address derivation
pub const CREATE2_PREFIX: u8 = 0xff;

#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Debug)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    pub const fn zero() -> Self {
        Hash::new([0; HASH_SIZE])
    }

    pub const fn max() -> Self {
        Hash::new([u8::MAX; HASH_SIZE])
    }

    /// Big-endian encoding of `value` in the low bytes, used for small salts
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        bytes[HASH_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Hash {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| "Invalid hex string")?;
        let bytes: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| "Invalid hash")?;
        Ok(Hash::new(bytes))
    }
}

// Hash a byte array using the blake3 algorithm
#[inline(always)]
pub fn hash(value: &[u8]) -> Hash {
    let result: [u8; HASH_SIZE] = blake3_hash(value).into();
    Hash(result)
}

impl std::hash::Hash for Hash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl AsRef<Hash> for Hash {
    fn as_ref(&self) -> &Hash {
        self
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", &self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        hex.parse::<Hash>().map_err(SerdeError::custom)
    }
}

/// Compute a nonce-based contract address (CREATE-style)
///
/// Formula: address = blake3(0xfe || deployer || nonce_le)
///
/// Every call to a factory's plain deployment path consumes one nonce of the
/// factory, so two plain deployments can never collide.
pub fn compute_contract_address(deployer: &Address, nonce: u64) -> Address {
    let mut data = Vec::with_capacity(1 + 32 + 8);
    data.push(CREATE_PREFIX);
    data.extend_from_slice(deployer.as_bytes());
    data.extend_from_slice(&nonce.to_le_bytes());

    Address::new(hash(&data).to_bytes())
}

/// Compute a deterministic contract address (CREATE2-style)
///
/// Formula: address = blake3(0xff || deployer || salt || code_hash)
///
/// This enables pre-computing contract addresses before deployment.
/// The result only depends on its three inputs, never on chain state.
///
/// # Arguments
/// * `deployer` - Address of the deploying factory
/// * `salt` - Caller-chosen 32-byte salt
/// * `code_hash` - Hash of the master implementation bytecode
pub fn compute_deterministic_address(deployer: &Address, salt: &Hash, code_hash: &Hash) -> Address {
    let mut data = Vec::with_capacity(1 + 32 + 32 + 32);
    data.push(CREATE2_PREFIX);
    data.extend_from_slice(deployer.as_bytes());
    data.extend_from_slice(salt.as_bytes());
    data.extend_from_slice(code_hash.as_bytes());

    Address::new(hash(&data).to_bytes())
}
