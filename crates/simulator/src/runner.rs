// simulator/src/runner.rs

use crate::config::{SimulatorConfig, Step};
use liquidity::{
    AddLiquidityParams, Clock, EventRecord, LiquidityError, ManualClock, PoolFactory, PoolState,
    RemoveLiquidityParams, SharedPool, SwapExactParams, SwapParams,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use swap_primitives::{Address, Amount, Timestamp};
use thiserror::Error;
use token_ledger::{InMemoryToken, LedgerError, TokenInfo, TokenLedger};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown token symbol: {0}")]
    UnknownToken(String),

    #[error(transparent)]
    Liquidity(#[from] LiquidityError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Report encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StepError {
    /// Short label used in reports
    pub fn category(&self) -> String {
        match self {
            StepError::UnknownAccount(_) | StepError::UnknownToken(_) => "scenario".into(),
            StepError::Liquidity(err) => format!("{:?}", err.category()).to_lowercase(),
            StepError::Ledger(_) => "ledger".into(),
            StepError::Encoding(_) => "encoding".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub time: Timestamp,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub address: Address,
    pub balance_a: Amount,
    pub balance_b: Amount,
    pub shares: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub pool: Address,
    pub token_a: TokenInfo,
    pub token_b: TokenInfo,
    pub steps: Vec<StepOutcome>,
    pub final_state: PoolState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_a_to_b: Option<String>,
    pub accounts: BTreeMap<String, AccountReport>,
    pub events: Vec<EventRecord>,
}

impl SimulationReport {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|step| !step.ok).count()
    }
}

/// One pool over two in-memory tokens, driven by a manual clock
pub struct Simulation {
    clock: Arc<ManualClock>,
    token_a: Arc<InMemoryToken>,
    token_b: Arc<InMemoryToken>,
    pool: SharedPool,
    accounts: BTreeMap<String, Address>,
    price_precision: u32,
}

impl Simulation {
    pub fn new(config: &SimulatorConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let clock = Arc::new(ManualClock::new(config.start_time));
        let token_a = Arc::new(InMemoryToken::new(
            &config.token_a.symbol,
            config.token_a.decimals,
        ));
        let token_b = Arc::new(InMemoryToken::new(
            &config.token_b.symbol,
            config.token_b.decimals,
        ));

        let mut factory = PoolFactory::new(clock.clone(), config.pool.clone())?;
        let pool = factory.create_pool(token_a.clone(), token_b.clone())?;

        let mut accounts = BTreeMap::new();
        for spec in &config.accounts {
            let address = Address::from_label(&spec.name);
            token_a.mint(&address, &spec.balance_a)?;
            token_b.mint(&address, &spec.balance_b)?;
            if spec.approve_pool {
                token_a.approve(&address, &pool.address(), &Amount::max_value())?;
                token_b.approve(&address, &pool.address(), &Amount::max_value())?;
            }
            debug!(account = %spec.name, %address, "account funded");
            accounts.insert(spec.name.clone(), address);
        }

        info!(
            pool = %pool.address(),
            accounts = accounts.len(),
            start_time = config.start_time,
            "simulation ready"
        );

        Ok(Self {
            clock,
            token_a,
            token_b,
            pool,
            accounts,
            price_precision: config.pool.price_precision,
        })
    }

    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    pub fn token_a(&self) -> &Arc<InMemoryToken> {
        &self.token_a
    }

    pub fn token_b(&self) -> &Arc<InMemoryToken> {
        &self.token_b
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn account(&self, name: &str) -> Result<Address, StepError> {
        self.accounts
            .get(name)
            .copied()
            .ok_or_else(|| StepError::UnknownAccount(name.to_string()))
    }

    fn recipient(&self, account: &Address, to: &Option<String>) -> Result<Address, StepError> {
        match to {
            Some(name) => self.account(name),
            None => Ok(*account),
        }
    }

    fn token(&self, symbol: &str) -> Result<Address, StepError> {
        if symbol == self.token_a.symbol() {
            Ok(self.token_a.token())
        } else if symbol == self.token_b.symbol() {
            Ok(self.token_b.token())
        } else {
            Err(StepError::UnknownToken(symbol.to_string()))
        }
    }

    fn deadline(&self, ttl: i64) -> Timestamp {
        self.now().saturating_add_signed(ttl)
    }

    /// Run every step in order; a failing step is recorded and the run goes on
    pub async fn run(&self, steps: &[Step]) -> SimulationReport {
        let mut outcomes = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let outcome = match self.apply(step).await {
                Ok(result) => StepOutcome {
                    index,
                    action: step.name(),
                    time: self.now(),
                    ok: true,
                    result: Some(result),
                    error: None,
                    category: None,
                },
                Err(err) => {
                    warn!(index, action = step.name(), error = %err, "step failed");
                    StepOutcome {
                        index,
                        action: step.name(),
                        time: self.now(),
                        ok: false,
                        result: None,
                        error: Some(err.to_string()),
                        category: Some(err.category()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        self.report(outcomes).await
    }

    pub async fn apply(&self, step: &Step) -> Result<Value, StepError> {
        let (a, b) = self.pool.tokens();
        match step {
            Step::AddLiquidity {
                account,
                amount_a,
                amount_b,
                min_a,
                min_b,
                to,
                ttl,
            } => {
                let caller = self.account(account)?;
                let params = AddLiquidityParams {
                    token_a: a,
                    token_b: b,
                    amount_a_desired: amount_a.clone(),
                    amount_b_desired: amount_b.clone(),
                    amount_a_min: min_a.clone(),
                    amount_b_min: min_b.clone(),
                    to: self.recipient(&caller, to)?,
                    deadline: self.deadline(*ttl),
                };
                let result = self.pool.add_liquidity(caller, params).await?;
                Ok(serde_json::to_value(result)?)
            }
            Step::RemoveLiquidity {
                account,
                shares,
                min_a,
                min_b,
                to,
                ttl,
            } => {
                let caller = self.account(account)?;
                let shares = match shares {
                    Some(shares) => shares.clone(),
                    None => self.pool.liquidity_of(&caller).await,
                };
                let params = RemoveLiquidityParams {
                    token_a: a,
                    token_b: b,
                    shares,
                    amount_a_min: min_a.clone(),
                    amount_b_min: min_b.clone(),
                    to: self.recipient(&caller, to)?,
                    deadline: self.deadline(*ttl),
                };
                let result = self.pool.remove_liquidity(caller, params).await?;
                Ok(serde_json::to_value(result)?)
            }
            Step::Swap {
                account,
                token_in,
                amount_in,
                min_out,
                to,
                ttl,
            } => {
                let caller = self.account(account)?;
                let params = SwapParams {
                    token_in: self.token(token_in)?,
                    amount_in: amount_in.clone(),
                    amount_out_min: min_out.clone(),
                    to: self.recipient(&caller, to)?,
                    deadline: self.deadline(*ttl),
                };
                let amount_out = self.pool.swap(caller, params).await?;
                Ok(json!({ "amount_out": amount_out }))
            }
            Step::SwapExact {
                account,
                amount_in,
                min_out,
                path,
                to,
                ttl,
            } => {
                let caller = self.account(account)?;
                let path = path
                    .iter()
                    .map(|symbol| self.token(symbol))
                    .collect::<Result<Vec<_>, _>>()?;
                let params = SwapExactParams {
                    amount_in: amount_in.clone(),
                    amount_out_min: min_out.clone(),
                    path,
                    to: self.recipient(&caller, to)?,
                    deadline: self.deadline(*ttl),
                };
                let amounts = self.pool.swap_exact_tokens_for_tokens(caller, params).await?;
                Ok(json!({ "amounts": amounts }))
            }
            Step::AdvanceTime { seconds } => {
                let now = self.clock.advance(*seconds);
                Ok(json!({ "now": now }))
            }
            Step::Price => {
                let pool = self.pool.read().await;
                let a_to_b = pool.price_a_to_b()?;
                let b_to_a = pool.price_b_to_a()?;
                Ok(json!({
                    "a_to_b": self.display_price(&a_to_b),
                    "b_to_a": self.display_price(&b_to_a),
                }))
            }
        }
    }

    fn display_price(&self, price: &Amount) -> String {
        match price.to_decimal(self.price_precision) {
            Some(decimal) => decimal.to_string(),
            None => price.to_string(),
        }
    }

    async fn report(&self, steps: Vec<StepOutcome>) -> SimulationReport {
        let final_state = self.pool.snapshot().await;
        let price_a_to_b = self
            .pool
            .read()
            .await
            .price_a_to_b()
            .ok()
            .map(|price| self.display_price(&price));

        let mut accounts = BTreeMap::new();
        for (name, address) in &self.accounts {
            accounts.insert(
                name.clone(),
                AccountReport {
                    address: *address,
                    balance_a: self.token_a.balance_of(address),
                    balance_b: self.token_b.balance_of(address),
                    shares: final_state.shares_of(address),
                },
            );
        }

        SimulationReport {
            pool: self.pool.address(),
            token_a: self.token_a.info().clone(),
            token_b: self.token_b.info().clone(),
            steps,
            final_state,
            price_a_to_b,
            accounts,
            events: self.pool.events().await,
        }
    }
}
