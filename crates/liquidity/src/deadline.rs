// liquidity/src/deadline.rs

use crate::{LiquidityError, LiquidityResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use swap_primitives::Timestamp;

/// Source of the current block time
pub trait Clock: Send + Sync {
    /// Current time in Unix epoch seconds
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `chrono::Utc`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move time forward by `seconds`, returning the new time
    pub fn advance(&self, seconds: u64) -> Timestamp {
        self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Rejects calls whose deadline has passed
///
/// Checked once on entry to each mutating operation; a call that is valid at
/// `now == deadline` succeeds.
#[derive(Clone)]
pub struct DeadlineGuard {
    clock: Arc<dyn Clock>,
}

impl DeadlineGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn check(&self, deadline: Timestamp) -> LiquidityResult<()> {
        let now = self.clock.now();
        if now > deadline {
            return Err(LiquidityError::DeadlineExpired { deadline, now });
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeadlineGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineGuard")
            .field("now", &self.clock.now())
            .finish()
    }
}
