// simulator/src/config.rs

use liquidity::PoolConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use swap_primitives::{Amount, Timestamp};

/// Scenario file: two tokens, one pool, funded accounts and scripted steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Block time at which the scenario starts
    #[serde(default = "default_start_time")]
    pub start_time: Timestamp,
    #[serde(default)]
    pub pool: PoolConfig,
    pub token_a: TokenSpec,
    pub token_b: TokenSpec,
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub name: String,
    #[serde(default)]
    pub balance_a: Amount,
    #[serde(default)]
    pub balance_b: Amount,
    /// Grant the pool an unlimited allowance on both tokens
    #[serde(default = "default_true")]
    pub approve_pool: bool,
}

/// One scripted operation
///
/// `ttl` is the deadline offset from the current block time in seconds;
/// a negative value produces an already-expired deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    AddLiquidity {
        account: String,
        amount_a: Amount,
        amount_b: Amount,
        #[serde(default)]
        min_a: Amount,
        #[serde(default)]
        min_b: Amount,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default = "default_ttl")]
        ttl: i64,
    },
    RemoveLiquidity {
        account: String,
        /// Shares to burn; all of the account's shares when omitted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shares: Option<Amount>,
        #[serde(default)]
        min_a: Amount,
        #[serde(default)]
        min_b: Amount,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default = "default_ttl")]
        ttl: i64,
    },
    Swap {
        account: String,
        /// Symbol of the input token
        token_in: String,
        amount_in: Amount,
        #[serde(default)]
        min_out: Amount,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default = "default_ttl")]
        ttl: i64,
    },
    SwapExact {
        account: String,
        amount_in: Amount,
        #[serde(default)]
        min_out: Amount,
        /// Token symbols, e.g. ["TKNA", "TKNB"]
        path: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default = "default_ttl")]
        ttl: i64,
    },
    AdvanceTime {
        seconds: u64,
    },
    Price,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AddLiquidity { .. } => "add_liquidity",
            Step::RemoveLiquidity { .. } => "remove_liquidity",
            Step::Swap { .. } => "swap",
            Step::SwapExact { .. } => "swap_exact",
            Step::AdvanceTime { .. } => "advance_time",
            Step::Price => "price",
        }
    }
}

fn default_start_time() -> Timestamp {
    1_700_000_000
}

fn default_decimals() -> u8 {
    18
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> i64 {
    3600
}

fn ether(whole: u64) -> Amount {
    Amount::from_units(whole, 18)
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            pool: PoolConfig::default(),
            token_a: TokenSpec {
                symbol: "TKNA".into(),
                decimals: 18,
            },
            token_b: TokenSpec {
                symbol: "TKNB".into(),
                decimals: 18,
            },
            accounts: vec![
                AccountSpec {
                    name: "alice".into(),
                    balance_a: ether(10_000),
                    balance_b: ether(10_000),
                    approve_pool: true,
                },
                AccountSpec {
                    name: "bob".into(),
                    balance_a: ether(1_000),
                    balance_b: ether(1_000),
                    approve_pool: true,
                },
            ],
            steps: vec![
                Step::AddLiquidity {
                    account: "alice".into(),
                    amount_a: ether(100),
                    amount_b: ether(200),
                    min_a: Amount::zero(),
                    min_b: Amount::zero(),
                    to: None,
                    ttl: default_ttl(),
                },
                Step::Price,
                Step::Swap {
                    account: "bob".into(),
                    token_in: "TKNA".into(),
                    amount_in: ether(10),
                    min_out: Amount::zero(),
                    to: None,
                    ttl: default_ttl(),
                },
                Step::SwapExact {
                    account: "bob".into(),
                    amount_in: ether(5),
                    min_out: Amount::zero(),
                    path: vec!["TKNA".into(), "TKNB".into()],
                    to: None,
                    ttl: default_ttl(),
                },
                Step::AddLiquidity {
                    account: "bob".into(),
                    amount_a: ether(50),
                    amount_b: ether(200),
                    min_a: Amount::zero(),
                    min_b: Amount::zero(),
                    to: None,
                    ttl: default_ttl(),
                },
                Step::AdvanceTime { seconds: 7200 },
                Step::Swap {
                    account: "bob".into(),
                    token_in: "TKNB".into(),
                    amount_in: ether(20),
                    min_out: Amount::zero(),
                    to: None,
                    ttl: -1,
                },
                Step::RemoveLiquidity {
                    account: "alice".into(),
                    shares: None,
                    min_a: Amount::zero(),
                    min_b: Amount::zero(),
                    to: None,
                    ttl: default_ttl(),
                },
                Step::Price,
            ],
        }
    }
}

impl SimulatorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Structural checks that do not need a running pool
    pub fn validate(&self) -> anyhow::Result<()> {
        self.pool.validate()?;
        if self.token_a.symbol == self.token_b.symbol {
            anyhow::bail!("token symbols must differ: {}", self.token_a.symbol);
        }

        let mut names = HashSet::new();
        for account in &self.accounts {
            if !names.insert(account.name.as_str()) {
                anyhow::bail!("duplicate account name: {}", account.name);
            }
        }
        Ok(())
    }
}
