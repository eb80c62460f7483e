// primitives/src/lib.rs

//! Shared value types for the swap engine
//!
//! This crate provides:
//! - `Address`: 20-byte account / token / pool identity
//! - `Amount`: unsigned token quantity with 256-bit bounds
//! - Keccak-256 hashing used for deterministic identity derivation

pub mod address;
pub mod amount;
pub mod hash;

pub use address::Address;
pub use amount::Amount;
pub use hash::keccak256;

/// Timestamp in Unix epoch seconds
pub type Timestamp = u64;

/// Result type for primitive parsing and conversion
pub type PrimitivesResult<T> = Result<T, PrimitivesError>;

/// Errors that can occur when building primitive values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitivesError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount exceeds 256 bits: {0}")]
    AmountOverflow(String),
}
