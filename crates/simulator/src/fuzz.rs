// simulator/src/fuzz.rs

use anyhow::{bail, Context};
use liquidity::{
    AddLiquidityParams, Clock, LiquidityError, ManualClock, PoolConfig, PoolFactory, PoolState,
    RemoveLiquidityParams, SharedPool, SwapParams,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use swap_primitives::{Address, Amount};
use token_ledger::{InMemoryToken, TokenLedger};
use tracing::{debug, info};

/// Seconds of block time between trades
const BLOCK_TIME: u64 = 12;
const DEADLINE_WINDOW: u64 = 60;

#[derive(Debug, Clone)]
pub struct FuzzConfig {
    pub trades: usize,
    pub seed: u64,
    pub traders: usize,
    pub pool: PoolConfig,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            trades: 1_000,
            seed: 42,
            traders: 4,
            pool: PoolConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FuzzSummary {
    pub seed: u64,
    pub trades: usize,
    pub succeeded: usize,
    /// Rejected operations keyed by error category
    pub rejected: BTreeMap<String, usize>,
    pub events: usize,
    pub k_start: Amount,
    pub k_end: Amount,
    pub final_state: PoolState,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Add,
    Remove,
    Swap { a_to_b: bool },
}

/// Drive a funded pool with seeded random operations
///
/// Every operation, accepted or rejected, is followed by a full invariant
/// check and a ledger audit; the first violation aborts the run.
pub async fn fuzz(config: FuzzConfig) -> anyhow::Result<FuzzSummary> {
    if config.traders == 0 {
        bail!("at least one trader is required");
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let token_a = Arc::new(InMemoryToken::new("FUZZA", 18));
    let token_b = Arc::new(InMemoryToken::new("FUZZB", 18));
    let mut factory = PoolFactory::new(clock.clone(), config.pool.clone())?;
    let pool = factory.create_pool(token_a.clone(), token_b.clone())?;

    let traders: Vec<Address> = (0..config.traders)
        .map(|i| Address::from_label(&format!("fuzz-trader-{i}")))
        .collect();
    let bankroll = Amount::from_units(1_000_000_000, 18);
    for trader in &traders {
        for token in [&token_a, &token_b] {
            token.mint(trader, &bankroll)?;
            token.approve(trader, &pool.address(), &Amount::max_value())?;
        }
    }

    let (a, b) = pool.tokens();
    pool.add_liquidity(
        traders[0],
        AddLiquidityParams {
            token_a: a,
            token_b: b,
            amount_a_desired: Amount::from_units(1_000_000, 18),
            amount_b_desired: Amount::from_units(2_000_000, 18),
            amount_a_min: Amount::zero(),
            amount_b_min: Amount::zero(),
            to: traders[0],
            deadline: clock.now(),
        },
    )
    .await
    .context("seeding the pool")?;
    let k_start = pool.snapshot().await.k()?;

    let mut succeeded = 0;
    let mut rejected: BTreeMap<String, usize> = BTreeMap::new();

    for trade in 0..config.trades {
        clock.advance(BLOCK_TIME);
        let trader = traders[rng.gen_range(0..traders.len())];
        let action = match rng.gen_range(0..10) {
            0 | 1 => Action::Add,
            2 => Action::Remove,
            _ => Action::Swap {
                a_to_b: rng.gen_bool(0.5),
            },
        };

        let before = pool.snapshot().await;
        let outcome = execute(&pool, &mut rng, trader, action, clock.now()).await;
        let after = pool.snapshot().await;

        after
            .check_invariants()
            .with_context(|| format!("trade {trade}: invariants broken after {action:?}"))?;
        pool.audit()
            .await
            .with_context(|| format!("trade {trade}: ledger audit failed after {action:?}"))?;

        match outcome {
            Ok(()) => {
                succeeded += 1;
                if matches!(action, Action::Swap { .. }) && after.k()? < before.k()? {
                    bail!("trade {trade}: swap decreased k");
                }
            }
            Err(err) => {
                if after != before {
                    bail!("trade {trade}: rejected {action:?} changed pool state: {err}");
                }
                debug!(trade, ?action, error = %err, "operation rejected");
                let key = format!("{:?}", err.category()).to_lowercase();
                *rejected.entry(key).or_default() += 1;
            }
        }
    }

    let final_state = pool.snapshot().await;
    let summary = FuzzSummary {
        seed: config.seed,
        trades: config.trades,
        succeeded,
        rejected,
        events: pool.events().await.len(),
        k_start,
        k_end: final_state.k()?,
        final_state,
    };
    info!(
        seed = summary.seed,
        trades = summary.trades,
        succeeded = summary.succeeded,
        "fuzz run complete"
    );
    Ok(summary)
}

async fn execute(
    pool: &SharedPool,
    rng: &mut StdRng,
    trader: Address,
    action: Action,
    now: u64,
) -> Result<(), LiquidityError> {
    let (a, b) = pool.tokens();
    let deadline = now + DEADLINE_WINDOW;
    match action {
        Action::Add => {
            let params = AddLiquidityParams {
                token_a: a,
                token_b: b,
                amount_a_desired: random_amount(rng),
                amount_b_desired: random_amount(rng),
                amount_a_min: Amount::zero(),
                amount_b_min: Amount::zero(),
                to: trader,
                deadline,
            };
            pool.add_liquidity(trader, params).await.map(|_| ())
        }
        Action::Remove => {
            let held = pool.liquidity_of(&trader).await;
            let percent = Amount::from_u64(rng.gen_range(1..=100));
            let shares = held
                .checked_mul(&percent)
                .and_then(|scaled| scaled.checked_div(&Amount::from_u64(100)))
                .unwrap_or_default();
            let params = RemoveLiquidityParams {
                token_a: a,
                token_b: b,
                shares,
                amount_a_min: Amount::zero(),
                amount_b_min: Amount::zero(),
                to: trader,
                deadline,
            };
            pool.remove_liquidity(trader, params).await.map(|_| ())
        }
        Action::Swap { a_to_b } => {
            let params = SwapParams {
                token_in: if a_to_b { a } else { b },
                amount_in: random_amount(rng),
                amount_out_min: Amount::zero(),
                to: trader,
                deadline,
            };
            pool.swap(trader, params).await.map(|_| ())
        }
    }
}

/// Log-uniform amount between 1 wei and 10^24
fn random_amount(rng: &mut StdRng) -> Amount {
    let digits = rng.gen_range(0..24u32);
    let mantissa = rng.gen_range(1..10u64);
    Amount::from_u64(mantissa)
        .checked_mul(&Amount::pow10(digits))
        .unwrap_or_else(Amount::one)
}
