// liquidity/src/pool.rs

use crate::{
    checked,
    deadline::{Clock, DeadlineGuard},
    events::{EventLog, PoolEvent},
    factory::PoolConfig,
    math::{self, SwapQuote},
    state::{PoolPhase, PoolState},
    LiquidityError, LiquidityResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swap_primitives::{Address, Amount, Timestamp};
use token_ledger::{TokenLedger, TransferReceipt};

/// Arguments of [`LiquidityPool::add_liquidity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityParams {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: Amount,
    pub amount_b_desired: Amount,
    pub amount_a_min: Amount,
    pub amount_b_min: Amount,
    /// Recipient of the minted shares
    pub to: Address,
    pub deadline: Timestamp,
}

/// Outcome of a deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityResult {
    pub amount_a: Amount,
    pub amount_b: Amount,
    pub minted: Amount,
}

/// Arguments of [`LiquidityPool::remove_liquidity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityParams {
    pub token_a: Address,
    pub token_b: Address,
    /// Shares to burn from the caller's balance
    pub shares: Amount,
    pub amount_a_min: Amount,
    pub amount_b_min: Amount,
    /// Recipient of the withdrawn tokens
    pub to: Address,
    pub deadline: Timestamp,
}

/// Outcome of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityResult {
    pub amount_a: Amount,
    pub amount_b: Amount,
}

/// Arguments of [`LiquidityPool::swap`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
    pub token_in: Address,
    pub amount_in: Amount,
    pub amount_out_min: Amount,
    pub to: Address,
    pub deadline: Timestamp,
}

/// Arguments of [`LiquidityPool::swap_exact_tokens_for_tokens`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExactParams {
    pub amount_in: Amount,
    pub amount_out_min: Amount,
    /// Must be exactly `[token_a, token_b]`
    pub path: Vec<Address>,
    pub to: Address,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

/// One token movement of a settlement
#[derive(Debug, Clone)]
enum Leg {
    /// Caller to pool, spent from the caller's allowance
    Pull {
        side: Side,
        from: Address,
        amount: Amount,
    },
    /// Pool to recipient
    Push {
        side: Side,
        to: Address,
        amount: Amount,
    },
}

impl Leg {
    fn side(&self) -> Side {
        match self {
            Leg::Pull { side, .. } | Leg::Push { side, .. } => *side,
        }
    }
}

/// Constant-product pool over one token pair
///
/// Owns the reserves and the share ledger; token balances live in the two
/// [`TokenLedger`] handles. Mutating methods take `&mut self`, so a ledger
/// can never re-enter the pool in the middle of a call.
pub struct LiquidityPool {
    address: Address,
    config: PoolConfig,
    token_a: Arc<dyn TokenLedger>,
    token_b: Arc<dyn TokenLedger>,
    guard: DeadlineGuard,
    state: PoolState,
    events: EventLog,
}

impl LiquidityPool {
    /// Bind a pool at `address` to two distinct tokens
    pub fn new(
        address: Address,
        token_a: Arc<dyn TokenLedger>,
        token_b: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
        config: PoolConfig,
    ) -> LiquidityResult<Self> {
        config.validate()?;

        let (a, b) = (token_a.token(), token_b.token());
        if a.is_zero() {
            return Err(LiquidityError::InvalidToken(a));
        }
        if b.is_zero() {
            return Err(LiquidityError::InvalidToken(b));
        }
        if a == b {
            return Err(LiquidityError::IdenticalTokens(a));
        }
        if address.is_zero() {
            return Err(LiquidityError::InvalidConfiguration(
                "pool address is zero".into(),
            ));
        }

        Ok(Self {
            address,
            config,
            token_a,
            token_b,
            guard: DeadlineGuard::new(clock),
            state: PoolState::new(),
            events: EventLog::new(),
        })
    }

    /// Deposit both tokens at the current ratio and mint shares to `params.to`
    pub fn add_liquidity(
        &mut self,
        caller: &Address,
        params: AddLiquidityParams,
    ) -> LiquidityResult<AddLiquidityResult> {
        self.guard.check(params.deadline)?;
        self.ensure_pair(&params.token_a, &params.token_b)?;
        if params.amount_a_desired.is_zero() || params.amount_b_desired.is_zero() {
            return Err(LiquidityError::InvalidAmount(
                "desired amounts must be positive".into(),
            ));
        }
        if params.to.is_zero() {
            return Err(LiquidityError::InvalidRecipient);
        }

        let (amount_a, amount_b) = math::optimal_deposit(
            &params.amount_a_desired,
            &params.amount_b_desired,
            &params.amount_a_min,
            &params.amount_b_min,
            &self.state.reserve_a,
            &self.state.reserve_b,
        )?;
        let minted = math::shares_to_mint(
            &amount_a,
            &amount_b,
            &self.state.reserve_a,
            &self.state.reserve_b,
            &self.state.total_shares,
        )?;
        let minimum = Amount::from_u64(self.config.minimum_liquidity);
        if minted < minimum {
            return Err(LiquidityError::InsufficientLiquidityMinted { minted, minimum });
        }
        tracing::debug!(pool = %self.address, %amount_a, %amount_b, %minted, "deposit computed");

        let mut next = self.state.clone();
        next.reserve_a = checked(next.reserve_a.checked_add(&amount_a), "reserve A")?;
        next.reserve_b = checked(next.reserve_b.checked_add(&amount_b), "reserve B")?;
        next.mint_shares(&params.to, &minted)?;

        self.commit(
            next,
            vec![
                Leg::Pull {
                    side: Side::A,
                    from: *caller,
                    amount: amount_a.clone(),
                },
                Leg::Pull {
                    side: Side::B,
                    from: *caller,
                    amount: amount_b.clone(),
                },
            ],
        )?;

        tracing::info!(
            pool = %self.address,
            provider = %caller,
            to = %params.to,
            %amount_a,
            %amount_b,
            %minted,
            "liquidity added"
        );
        self.emit(PoolEvent::LiquidityAdded {
            provider: *caller,
            to: params.to,
            amount_a: amount_a.clone(),
            amount_b: amount_b.clone(),
            minted: minted.clone(),
        });

        Ok(AddLiquidityResult {
            amount_a,
            amount_b,
            minted,
        })
    }

    /// Burn the caller's shares and send the pro-rata reserves to `params.to`
    pub fn remove_liquidity(
        &mut self,
        caller: &Address,
        params: RemoveLiquidityParams,
    ) -> LiquidityResult<RemoveLiquidityResult> {
        self.guard.check(params.deadline)?;
        self.ensure_pair(&params.token_a, &params.token_b)?;
        if params.shares.is_zero() {
            return Err(LiquidityError::InvalidAmount("share amount is zero".into()));
        }
        if params.to.is_zero() {
            return Err(LiquidityError::InvalidRecipient);
        }

        let available = self.state.shares_of(caller);
        if params.shares > available {
            return Err(LiquidityError::InsufficientShares {
                required: params.shares,
                available,
            });
        }

        let (amount_a, amount_b) = math::pro_rata(
            &params.shares,
            &self.state.reserve_a,
            &self.state.reserve_b,
            &self.state.total_shares,
        )?;
        if amount_a.is_zero() || amount_b.is_zero() {
            return Err(LiquidityError::InvalidAmount(
                "share amount too small to withdraw".into(),
            ));
        }
        if amount_a < params.amount_a_min {
            return Err(LiquidityError::InsufficientAmountA {
                actual: amount_a,
                minimum: params.amount_a_min,
            });
        }
        if amount_b < params.amount_b_min {
            return Err(LiquidityError::InsufficientAmountB {
                actual: amount_b,
                minimum: params.amount_b_min,
            });
        }

        let mut next = self.state.clone();
        next.reserve_a = checked(next.reserve_a.checked_sub(&amount_a), "reserve A")?;
        next.reserve_b = checked(next.reserve_b.checked_sub(&amount_b), "reserve B")?;
        next.burn_shares(caller, &params.shares)?;

        self.commit(
            next,
            vec![
                Leg::Push {
                    side: Side::A,
                    to: params.to,
                    amount: amount_a.clone(),
                },
                Leg::Push {
                    side: Side::B,
                    to: params.to,
                    amount: amount_b.clone(),
                },
            ],
        )?;

        tracing::info!(
            pool = %self.address,
            provider = %caller,
            to = %params.to,
            %amount_a,
            %amount_b,
            shares = %params.shares,
            phase = ?self.state.phase(),
            "liquidity removed"
        );
        self.emit(PoolEvent::LiquidityRemoved {
            provider: *caller,
            to: params.to,
            amount_a: amount_a.clone(),
            amount_b: amount_b.clone(),
            shares: params.shares,
        });

        Ok(RemoveLiquidityResult { amount_a, amount_b })
    }

    /// Exact-input swap of `token_in` for the other pool token
    pub fn swap(&mut self, caller: &Address, params: SwapParams) -> LiquidityResult<Amount> {
        self.guard.check(params.deadline)?;
        self.execute_swap(
            caller,
            &params.token_in,
            &params.amount_in,
            &params.amount_out_min,
            &params.to,
        )
    }

    /// Router-style swap along `path == [token_a, token_b]`
    ///
    /// Returns the amounts at each hop: `[amount_in, amount_out]`.
    pub fn swap_exact_tokens_for_tokens(
        &mut self,
        caller: &Address,
        params: SwapExactParams,
    ) -> LiquidityResult<Vec<Amount>> {
        self.guard.check(params.deadline)?;
        if params.path.len() != 2 {
            return Err(LiquidityError::InvalidPath(format!(
                "expected 2 tokens, got {}",
                params.path.len()
            )));
        }
        if params.path[0] != self.token_a() || params.path[1] != self.token_b() {
            return Err(LiquidityError::InvalidPath(format!(
                "expected [{}, {}]",
                self.token_a(),
                self.token_b()
            )));
        }

        let amount_out = self.execute_swap(
            caller,
            &params.path[0],
            &params.amount_in,
            &params.amount_out_min,
            &params.to,
        )?;
        Ok(vec![params.amount_in, amount_out])
    }

    fn execute_swap(
        &mut self,
        caller: &Address,
        token_in: &Address,
        amount_in: &Amount,
        amount_out_min: &Amount,
        to: &Address,
    ) -> LiquidityResult<Amount> {
        let side_in = self.side_of(token_in)?;
        if amount_in.is_zero() {
            return Err(LiquidityError::InvalidAmount("input amount is zero".into()));
        }
        if to.is_zero() {
            return Err(LiquidityError::InvalidRecipient);
        }
        if self.state.is_empty() {
            return Err(LiquidityError::InsufficientLiquidity);
        }

        let (reserve_in, reserve_out, side_out) = match side_in {
            Side::A => (&self.state.reserve_a, &self.state.reserve_b, Side::B),
            Side::B => (&self.state.reserve_b, &self.state.reserve_a, Side::A),
        };
        let amount_out =
            math::get_amount_out_with_fee(amount_in, reserve_in, reserve_out, self.config.fee_bps)?;
        if amount_out.is_zero() || &amount_out < amount_out_min {
            return Err(LiquidityError::InsufficientOutputAmount {
                actual: amount_out,
                minimum: amount_out_min.clone().max(Amount::one()),
            });
        }

        let mut next = self.state.clone();
        match side_in {
            Side::A => {
                next.reserve_a = checked(next.reserve_a.checked_add(amount_in), "reserve A")?;
                next.reserve_b = checked(next.reserve_b.checked_sub(&amount_out), "reserve B")?;
            }
            Side::B => {
                next.reserve_b = checked(next.reserve_b.checked_add(amount_in), "reserve B")?;
                next.reserve_a = checked(next.reserve_a.checked_sub(&amount_out), "reserve A")?;
            }
        }
        // Unbounded product: reserves near the cap still compare correctly
        let k_next = next.reserve_a.inner() * next.reserve_b.inner();
        let k_prior = self.state.reserve_a.inner() * self.state.reserve_b.inner();
        if k_next < k_prior {
            return Err(LiquidityError::InvariantViolation(
                "swap decreased reserve product".into(),
            ));
        }

        self.commit(
            next,
            vec![
                Leg::Pull {
                    side: side_in,
                    from: *caller,
                    amount: amount_in.clone(),
                },
                Leg::Push {
                    side: side_out,
                    to: *to,
                    amount: amount_out.clone(),
                },
            ],
        )?;

        let token_out = self.ledger(side_out).token();
        tracing::info!(
            pool = %self.address,
            trader = %caller,
            %token_in,
            %amount_in,
            %amount_out,
            "swap executed"
        );
        self.emit(PoolEvent::Swap {
            trader: *caller,
            to: *to,
            token_in: *token_in,
            token_out,
            amount_in: amount_in.clone(),
            amount_out: amount_out.clone(),
        });

        Ok(amount_out)
    }

    /// Spot price of `token_in` in units of `token_out`, scaled by 10^precision
    pub fn get_price(&self, token_in: &Address, token_out: &Address) -> LiquidityResult<Amount> {
        let side_in = self.side_of(token_in)?;
        let side_out = self.side_of(token_out)?;
        if side_in == side_out {
            return Err(LiquidityError::IdenticalTokens(*token_in));
        }
        let (reserve_in, reserve_out) = self.reserves_for(side_in);
        math::spot_price(reserve_in, reserve_out, self.config.price_precision)
    }

    pub fn price_a_to_b(&self) -> LiquidityResult<Amount> {
        math::spot_price(
            &self.state.reserve_a,
            &self.state.reserve_b,
            self.config.price_precision,
        )
    }

    pub fn price_b_to_a(&self) -> LiquidityResult<Amount> {
        math::spot_price(
            &self.state.reserve_b,
            &self.state.reserve_a,
            self.config.price_precision,
        )
    }

    /// Swap formula at this pool's fee, for caller-supplied reserves
    pub fn get_amount_out(
        &self,
        amount_in: &Amount,
        reserve_in: &Amount,
        reserve_out: &Amount,
    ) -> LiquidityResult<Amount> {
        math::get_amount_out_with_fee(amount_in, reserve_in, reserve_out, self.config.fee_bps)
    }

    /// Simulate a swap of `amount_in` against the current reserves
    pub fn quote_swap(
        &self,
        token_in: &Address,
        amount_in: &Amount,
    ) -> LiquidityResult<SwapQuote> {
        let side_in = self.side_of(token_in)?;
        let (reserve_in, reserve_out) = self.reserves_for(side_in);
        math::swap_quote(amount_in, reserve_in, reserve_out, self.config.fee_bps)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token_a(&self) -> Address {
        self.token_a.token()
    }

    pub fn token_b(&self) -> Address {
        self.token_b.token()
    }

    pub fn reserve_a(&self) -> Amount {
        self.state.reserve_a.clone()
    }

    pub fn reserve_b(&self) -> Amount {
        self.state.reserve_b.clone()
    }

    pub fn reserves(&self) -> (Amount, Amount) {
        (self.state.reserve_a.clone(), self.state.reserve_b.clone())
    }

    pub fn total_liquidity(&self) -> Amount {
        self.state.total_shares.clone()
    }

    pub fn liquidity_of(&self, provider: &Address) -> Amount {
        self.state.shares_of(provider)
    }

    pub fn phase(&self) -> PoolPhase {
        self.state.phase()
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Check state invariants and that the ledgers actually hold the reserves
    ///
    /// Ledger balances may exceed reserves (direct donations), never fall short.
    pub fn audit(&self) -> LiquidityResult<()> {
        self.state.check_invariants()?;
        for side in [Side::A, Side::B] {
            let held = self.ledger(side).balance_of(&self.address);
            let (reserve, _) = self.reserves_for(side);
            if &held < reserve {
                return Err(LiquidityError::InvariantViolation(format!(
                    "pool holds {held} of {}, reserve is {reserve}",
                    self.ledger(side).token()
                )));
            }
        }
        Ok(())
    }

    fn ensure_pair(&self, token_a: &Address, token_b: &Address) -> LiquidityResult<()> {
        if token_a.is_zero() {
            return Err(LiquidityError::InvalidToken(*token_a));
        }
        if token_b.is_zero() {
            return Err(LiquidityError::InvalidToken(*token_b));
        }
        if token_a == token_b {
            return Err(LiquidityError::IdenticalTokens(*token_a));
        }

        let (expected_a, expected_b) = (self.token_a(), self.token_b());
        if *token_a == expected_a && *token_b == expected_b {
            return Ok(());
        }
        if *token_a == expected_b && *token_b == expected_a {
            return Err(LiquidityError::InvalidTokenOrder {
                expected_a,
                expected_b,
            });
        }
        let unknown = if *token_a != expected_a && *token_a != expected_b {
            token_a
        } else {
            token_b
        };
        Err(LiquidityError::InvalidToken(*unknown))
    }

    fn side_of(&self, token: &Address) -> LiquidityResult<Side> {
        if token.is_zero() {
            return Err(LiquidityError::InvalidToken(*token));
        }
        if *token == self.token_a() {
            Ok(Side::A)
        } else if *token == self.token_b() {
            Ok(Side::B)
        } else {
            Err(LiquidityError::InvalidToken(*token))
        }
    }

    fn ledger(&self, side: Side) -> &Arc<dyn TokenLedger> {
        match side {
            Side::A => &self.token_a,
            Side::B => &self.token_b,
        }
    }

    /// `(reserve_in, reserve_out)` when trading from `side`
    fn reserves_for(&self, side: Side) -> (&Amount, &Amount) {
        match side {
            Side::A => (&self.state.reserve_a, &self.state.reserve_b),
            Side::B => (&self.state.reserve_b, &self.state.reserve_a),
        }
    }

    /// Install `next` as the pool state, then move tokens
    ///
    /// State is updated before any ledger call. If a leg fails, the legs
    /// that already settled are reverted from their receipts in reverse
    /// order and the previous state is restored. Transfers made by anyone
    /// else in the meantime are left alone.
    fn commit(&mut self, next: PoolState, legs: Vec<Leg>) -> LiquidityResult<()> {
        next.check_invariants()?;
        let prior = std::mem::replace(&mut self.state, next);

        let mut settled: Vec<(Side, TransferReceipt)> = Vec::with_capacity(legs.len());
        for leg in &legs {
            match self.execute_leg(leg) {
                Ok(Some(receipt)) => settled.push((leg.side(), receipt)),
                Ok(None) => {}
                Err(err) => {
                    self.state = prior;
                    self.unwind(settled)?;
                    tracing::warn!(
                        pool = %self.address,
                        error = %err,
                        "settlement failed, reverted"
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn unwind(&self, settled: Vec<(Side, TransferReceipt)>) -> LiquidityResult<()> {
        for (side, receipt) in settled.iter().rev() {
            if let Err(err) = self.ledger(*side).revert(receipt) {
                tracing::error!(
                    pool = %self.address,
                    token = %receipt.token,
                    error = %err,
                    "failed to revert settled leg"
                );
                return Err(LiquidityError::InvariantViolation(format!(
                    "could not revert transfer of {} from {} to {}: {}",
                    receipt.amount, receipt.from, receipt.to, err
                )));
            }
        }
        Ok(())
    }

    fn execute_leg(&self, leg: &Leg) -> LiquidityResult<Option<TransferReceipt>> {
        match leg {
            Leg::Pull { amount, .. } | Leg::Push { amount, .. } if amount.is_zero() => Ok(None),
            Leg::Pull { side, from, amount } => {
                let receipt = self
                    .ledger(*side)
                    .transfer_from(&self.address, from, &self.address, amount)?;
                Ok(Some(receipt))
            }
            Leg::Push { side, to, amount } => {
                let receipt = self.ledger(*side).transfer(&self.address, to, amount)?;
                Ok(Some(receipt))
            }
        }
    }

    fn emit(&mut self, event: PoolEvent) {
        let now = self.guard.now();
        self.events.append(self.address, now, event);
    }
}

impl std::fmt::Debug for LiquidityPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiquidityPool")
            .field("address", &self.address)
            .field("token_a", &self.token_a())
            .field("token_b", &self.token_b())
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}
