// liquidity/src/lib.rs

//! Two-token constant-product liquidity engine
//!
//! This crate implements a single-pair automated market maker:
//! - Proportional liquidity shares minted on deposit, burned on withdrawal
//! - Fee-bearing swaps against `reserve_a * reserve_b = k`
//! - Deadline and slippage guards on every mutating entry point
//! - Atomic settlement through the `TokenLedger` capability
//!
//! Every mutating call follows checks-effects-interactions: validate
//! inputs, compute amounts, update pool state, then move tokens. A failed
//! transfer rolls back both the ledgers and the pool state.

pub mod deadline;
pub mod events;
pub mod factory;
pub mod handle;
pub mod math;
pub mod pool;
pub mod state;

pub use deadline::{Clock, DeadlineGuard, ManualClock, SystemClock};
pub use events::{EventLog, EventRecord, PoolEvent};
pub use factory::{PoolConfig, PoolFactory, TradingPair};
pub use handle::SharedPool;
pub use math::SwapQuote;
pub use pool::{
    AddLiquidityParams, AddLiquidityResult, LiquidityPool, RemoveLiquidityParams,
    RemoveLiquidityResult, SwapExactParams, SwapParams,
};
pub use state::{PoolPhase, PoolState};

use swap_primitives::{Address, Amount, Timestamp};
use token_ledger::LedgerError;

/// Result type for liquidity operations
pub type LiquidityResult<T> = Result<T, LiquidityError>;

/// Errors that can occur in liquidity operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidityError {
    #[error("Deadline expired: deadline {deadline}, now {now}")]
    DeadlineExpired { deadline: Timestamp, now: Timestamp },

    #[error("Invalid token: {0}")]
    InvalidToken(Address),

    #[error("Identical tokens: {0}")]
    IdenticalTokens(Address),

    #[error("Invalid token order: expected ({expected_a}, {expected_b})")]
    InvalidTokenOrder {
        expected_a: Address,
        expected_b: Address,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Insufficient A amount: got {actual}, minimum {minimum}")]
    InsufficientAmountA { actual: Amount, minimum: Amount },

    #[error("Insufficient B amount: got {actual}, minimum {minimum}")]
    InsufficientAmountB { actual: Amount, minimum: Amount },

    #[error("Insufficient output amount: got {actual}, minimum {minimum}")]
    InsufficientOutputAmount { actual: Amount, minimum: Amount },

    #[error("Insufficient liquidity minted: got {minted}, minimum {minimum}")]
    InsufficientLiquidityMinted { minted: Amount, minimum: Amount },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: Amount, available: Amount },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Pool already exists: {0}")]
    PoolExists(Address),

    #[error("Pool not found for pair ({0}, {1})")]
    PoolNotFound(Address, Address),
}

/// Coarse classification of a [`LiquidityError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Deadline passed
    Temporal,
    /// Malformed input: amounts, identities, paths
    Validation,
    /// A computed amount fell below the caller's floor
    Slippage,
    /// Pool or caller does not hold enough liquidity
    LiquidityState,
    /// A token ledger refused a transfer
    Ledger,
    /// Checked arithmetic or invariant failure
    Arithmetic,
    /// Factory or pool configuration problem
    Configuration,
}

impl LiquidityError {
    pub fn category(&self) -> ErrorCategory {
        use LiquidityError::*;
        match self {
            DeadlineExpired { .. } => ErrorCategory::Temporal,
            InvalidToken(_)
            | IdenticalTokens(_)
            | InvalidTokenOrder { .. }
            | InvalidPath(_)
            | InvalidAmount(_)
            | InvalidRecipient => ErrorCategory::Validation,
            InsufficientAmountA { .. }
            | InsufficientAmountB { .. }
            | InsufficientOutputAmount { .. }
            | InsufficientLiquidityMinted { .. } => ErrorCategory::Slippage,
            InsufficientLiquidity | InsufficientShares { .. } => ErrorCategory::LiquidityState,
            Ledger(_) => ErrorCategory::Ledger,
            Arithmetic(_) | InvariantViolation(_) => ErrorCategory::Arithmetic,
            InvalidConfiguration(_) | PoolExists(_) | PoolNotFound(..) => {
                ErrorCategory::Configuration
            }
        }
    }
}

/// Lift a checked-arithmetic `None` into an [`LiquidityError::Arithmetic`]
pub(crate) fn checked<T>(value: Option<T>, what: &str) -> LiquidityResult<T> {
    value.ok_or_else(|| LiquidityError::Arithmetic(what.to_string()))
}
