// ledger/src/lib.rs

//! Fungible token ledger capability
//!
//! The liquidity engine never owns token balances. It talks to each asset
//! through the [`TokenLedger`] trait, which mirrors the ERC-20 surface
//! (balanceOf, allowance, approve, transfer, transferFrom). Every transfer
//! hands back a [`TransferReceipt`]; a multi-transfer settlement that fails
//! part way reverts the receipts it already holds and nothing else.

pub mod memory;

pub use memory::{InMemoryToken, TokenInfo};

use swap_primitives::{Address, Amount};

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur in ledger operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient balance for {owner}: required {required}, available {available}")]
    InsufficientBalance {
        owner: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance from {owner} to {spender}: required {required}, available {available}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Balance overflow for {0}")]
    Overflow(Address),

    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

/// Record of one completed transfer, enough to undo it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    /// `(spender, amount)` taken from `from`'s allowance, if any
    pub allowance_spent: Option<(Address, Amount)>,
}

/// Capability handle onto one fungible token
///
/// Methods take `&self`: implementations own their synchronization so a
/// handle can be shared behind an `Arc` by several pools and callers.
pub trait TokenLedger: Send + Sync {
    /// Identity of the token this ledger tracks
    fn token(&self) -> Address;

    fn balance_of(&self, owner: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Set `spender`'s allowance over `owner`'s balance to exactly `amount`
    fn approve(&self, owner: &Address, spender: &Address, amount: &Amount) -> LedgerResult<()>;

    /// Move `amount` from `from` to `to` on `from`'s own authority
    fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<TransferReceipt>;

    /// Move `amount` from `from` to `to` on `spender`'s allowance
    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<TransferReceipt>;

    /// Undo exactly the movement described by `receipt`
    ///
    /// Applied as an inverse delta: writes made by other callers since the
    /// transfer are left alone. Fails if the recipient no longer holds the
    /// amount.
    fn revert(&self, receipt: &TransferReceipt) -> LedgerResult<()>;
}
