// liquidity/src/handle.rs

use crate::{
    events::EventRecord,
    math::SwapQuote,
    pool::{
        AddLiquidityParams, AddLiquidityResult, LiquidityPool, RemoveLiquidityParams,
        RemoveLiquidityResult, SwapExactParams, SwapParams,
    },
    state::PoolState,
    LiquidityResult,
};
use std::sync::Arc;
use swap_primitives::{Address, Amount};
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};

/// Cloneable, thread-safe handle to one pool
///
/// Mutating calls hold the write lock from entry to settlement, so they are
/// serialized; queries share the read lock and always see a fully committed
/// state.
#[derive(Clone)]
pub struct SharedPool {
    address: Address,
    tokens: (Address, Address),
    inner: Arc<RwLock<LiquidityPool>>,
}

impl SharedPool {
    pub fn new(pool: LiquidityPool) -> Self {
        Self {
            address: pool.address(),
            tokens: (pool.token_a(), pool.token_b()),
            inner: Arc::new(RwLock::new(pool)),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// `(token_a, token_b)` in pool order
    pub fn tokens(&self) -> (Address, Address) {
        self.tokens
    }

    pub async fn add_liquidity(
        &self,
        caller: Address,
        params: AddLiquidityParams,
    ) -> LiquidityResult<AddLiquidityResult> {
        self.inner.write().await.add_liquidity(&caller, params)
    }

    pub async fn remove_liquidity(
        &self,
        caller: Address,
        params: RemoveLiquidityParams,
    ) -> LiquidityResult<RemoveLiquidityResult> {
        self.inner.write().await.remove_liquidity(&caller, params)
    }

    pub async fn swap(&self, caller: Address, params: SwapParams) -> LiquidityResult<Amount> {
        self.inner.write().await.swap(&caller, params)
    }

    pub async fn swap_exact_tokens_for_tokens(
        &self,
        caller: Address,
        params: SwapExactParams,
    ) -> LiquidityResult<Vec<Amount>> {
        self.inner
            .write()
            .await
            .swap_exact_tokens_for_tokens(&caller, params)
    }

    /// Consistent copy of reserves and shares
    pub async fn snapshot(&self) -> PoolState {
        self.inner.read().await.state().clone()
    }

    pub async fn get_price(
        &self,
        token_in: &Address,
        token_out: &Address,
    ) -> LiquidityResult<Amount> {
        self.inner.read().await.get_price(token_in, token_out)
    }

    pub async fn quote_swap(
        &self,
        token_in: &Address,
        amount_in: &Amount,
    ) -> LiquidityResult<SwapQuote> {
        self.inner.read().await.quote_swap(token_in, amount_in)
    }

    pub async fn reserves(&self) -> (Amount, Amount) {
        self.inner.read().await.reserves()
    }

    pub async fn total_liquidity(&self) -> Amount {
        self.inner.read().await.total_liquidity()
    }

    pub async fn liquidity_of(&self, provider: &Address) -> Amount {
        self.inner.read().await.liquidity_of(provider)
    }

    pub async fn events(&self) -> Vec<EventRecord> {
        self.inner.read().await.events().records().to_vec()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.inner.read().await.events().subscribe()
    }

    pub async fn audit(&self) -> LiquidityResult<()> {
        self.inner.read().await.audit()
    }

    /// Shared access for queries not wrapped above
    pub async fn read(&self) -> RwLockReadGuard<'_, LiquidityPool> {
        self.inner.read().await
    }
}

impl std::fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPool")
            .field("address", &self.address)
            .field("tokens", &self.tokens)
            .finish()
    }
}
