// primitives/src/address.rs

use crate::{hash::keccak256, PrimitivesError, PrimitivesResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address length in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Identity of an account, a token or a pool
///
/// Serialized as a `0x`-prefixed hex string so it can be used as a map key
/// in JSON and as a plain scalar in TOML.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Create address from bytes
    pub fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Derive an address from a domain tag and arbitrary parts
    ///
    /// Takes the low 20 bytes of `keccak256(domain || parts...)`, the same
    /// truncation Ethereum applies to public key hashes.
    pub fn derive(domain: &str, parts: &[&[u8]]) -> Self {
        let mut input: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
        input.push(domain.as_bytes());
        input.extend_from_slice(parts);

        let digest = keccak256(&input);
        let mut address = [0u8; ADDRESS_SIZE];
        address.copy_from_slice(&digest[12..32]);
        Self(address)
    }

    /// Deterministic address for a human-readable label ("alice", "TKNA")
    pub fn from_label(label: &str) -> Self {
        Self::derive("simpleswap/label", &[label.as_bytes()])
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> PrimitivesResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| PrimitivesError::InvalidAddress(e.to_string()))?;
        if bytes.len() != ADDRESS_SIZE {
            return Err(PrimitivesError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ADDRESS_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; ADDRESS_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The null identity; never a valid token or recipient
    pub fn zero() -> Self {
        Self([0u8; ADDRESS_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_SIZE]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

impl TryFrom<String> for Address {
    type Error = PrimitivesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}
