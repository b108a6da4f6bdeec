use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryInto,
    fmt::{Debug, Display, Error, Formatter},
    str::FromStr,
};

use super::{hash, HASH_SIZE};

/// Domain separator for label-derived addresses
const LABEL_DOMAIN: &[u8] = b"FORGE_ACCOUNT:";

/// Domain separator for system component addresses
const SYSTEM_DOMAIN: &[u8] = b"FORGE_SYSTEM:";

/// 32-byte account identifier on the hosting ledger.
///
/// The all-zero address is the null address: it never holds code and is
/// rejected wherever an owner or target is required.
#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Address([u8; HASH_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Address(bytes)
    }

    pub const fn zero() -> Self {
        Address([0; HASH_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; HASH_SIZE]
    }

    /// Stable address for a human readable actor label ("alice", "admin")
    pub fn from_label(label: &str) -> Self {
        let mut data = Vec::with_capacity(LABEL_DOMAIN.len() + label.len());
        data.extend_from_slice(LABEL_DOMAIN);
        data.extend_from_slice(label.as_bytes());
        Address(hash(&data).to_bytes())
    }

    /// Address of a built-in system component (registry, catalog)
    pub fn system(name: &str) -> Self {
        let mut data = Vec::with_capacity(SYSTEM_DOMAIN.len() + name.len());
        data.extend_from_slice(SYSTEM_DOMAIN);
        data.extend_from_slice(name.as_bytes());
        Address(hash(&data).to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 4 bytes in hex, enough to tell actors apart in logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| "Invalid hex string")?;
        let bytes: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| "Invalid address")?;
        Ok(Address::new(bytes))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "Address(0x{})", self.short())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'a> Deserialize<'a> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let hex = String::deserialize(deserializer)?;
        hex.parse::<Address>().map_err(SerdeError::custom)
    }
}
