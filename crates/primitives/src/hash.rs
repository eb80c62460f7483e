// primitives/src/hash.rs

use sha3::{Digest, Keccak256};

/// Hash output size in bytes
pub const HASH_SIZE: usize = 32;

/// Keccak-256 over the concatenation of `parts`
pub fn keccak256(parts: &[&[u8]]) -> [u8; HASH_SIZE] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; HASH_SIZE];
    digest.copy_from_slice(&hasher.finalize());
    digest
}
