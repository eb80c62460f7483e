// liquidity/src/factory.rs

use crate::{
    deadline::Clock,
    handle::SharedPool,
    math::{DEFAULT_FEE_BPS, FEE_DENOMINATOR, MINIMUM_LIQUIDITY, PRICE_PRECISION},
    pool::LiquidityPool,
    LiquidityError, LiquidityResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use swap_primitives::Address;
use token_ledger::TokenLedger;

/// Largest supported price precision; keeps `10^precision` far below 2^256
const MAX_PRICE_PRECISION: u32 = 36;

/// Pool parameters fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Swap fee in basis points (30 = 0.3%)
    pub fee_bps: u16,
    /// Smallest share amount a single deposit may mint
    pub minimum_liquidity: u64,
    /// Decimal digits of the price scale
    pub price_precision: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            minimum_liquidity: MINIMUM_LIQUIDITY,
            price_precision: PRICE_PRECISION,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> LiquidityResult<()> {
        if self.fee_bps == 0 || u64::from(self.fee_bps) >= FEE_DENOMINATOR {
            return Err(LiquidityError::InvalidConfiguration(format!(
                "fee_bps must be within 1..{FEE_DENOMINATOR}, got {}",
                self.fee_bps
            )));
        }
        if self.minimum_liquidity == 0 {
            return Err(LiquidityError::InvalidConfiguration(
                "minimum_liquidity must be positive".into(),
            ));
        }
        if self.price_precision > MAX_PRICE_PRECISION {
            return Err(LiquidityError::InvalidConfiguration(format!(
                "price_precision must be at most {MAX_PRICE_PRECISION}, got {}",
                self.price_precision
            )));
        }
        Ok(())
    }
}

/// Unordered token pair used as the factory's lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    pub token_a: Address,
    pub token_b: Address,
}

impl TradingPair {
    pub fn new(token_a: Address, token_b: Address) -> Self {
        Self { token_a, token_b }
    }

    /// Get canonical representation (sorted)
    pub fn canonical(&self) -> TradingPair {
        if self.token_a <= self.token_b {
            *self
        } else {
            TradingPair {
                token_a: self.token_b,
                token_b: self.token_a,
            }
        }
    }
}

/// Deterministic pool identity for an ordered pair
pub fn pool_address(token_a: &Address, token_b: &Address) -> Address {
    Address::derive("simpleswap/pool", &[token_a.as_bytes(), token_b.as_bytes()])
}

/// Creates and tracks one pool per token pair
pub struct PoolFactory {
    clock: Arc<dyn Clock>,
    config: PoolConfig,
    pools: HashMap<TradingPair, SharedPool>,
}

impl PoolFactory {
    pub fn new(clock: Arc<dyn Clock>, config: PoolConfig) -> LiquidityResult<Self> {
        config.validate()?;
        Ok(Self {
            clock,
            config,
            pools: HashMap::new(),
        })
    }

    /// Deploy a pool for `(token_a, token_b)` in that order
    ///
    /// Fails if a pool already exists for the pair in either order.
    pub fn create_pool(
        &mut self,
        token_a: Arc<dyn TokenLedger>,
        token_b: Arc<dyn TokenLedger>,
    ) -> LiquidityResult<SharedPool> {
        let key = TradingPair::new(token_a.token(), token_b.token()).canonical();
        if let Some(existing) = self.pools.get(&key) {
            return Err(LiquidityError::PoolExists(existing.address()));
        }

        let address = pool_address(&token_a.token(), &token_b.token());
        let pool = LiquidityPool::new(
            address,
            token_a,
            token_b,
            self.clock.clone(),
            self.config.clone(),
        )?;
        let handle = SharedPool::new(pool);

        tracing::info!(
            pool = %address,
            token_a = %key.token_a,
            token_b = %key.token_b,
            fee_bps = self.config.fee_bps,
            "pool created"
        );
        self.pools.insert(key, handle.clone());
        Ok(handle)
    }

    /// Look up the pool for a pair, in either order
    pub fn get_pool(&self, token_a: &Address, token_b: &Address) -> LiquidityResult<SharedPool> {
        self.pools
            .get(&TradingPair::new(*token_a, *token_b).canonical())
            .cloned()
            .ok_or(LiquidityError::PoolNotFound(*token_a, *token_b))
    }

    pub fn pools(&self) -> impl Iterator<Item = &SharedPool> {
        self.pools.values()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}
