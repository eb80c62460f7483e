// simulator/src/main.rs

use clap::{Parser, Subcommand};
use liquidity::{math, PoolConfig};
use swap_primitives::Amount;
use swap_simulator::{fuzz, FuzzConfig, Simulation, SimulatorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simpleswap")]
#[command(about = "Constant-product liquidity pool simulator", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default scenario file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./simpleswap.toml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Replay a scenario file
    Run {
        /// Scenario file path
        #[arg(short, long, default_value = "./simpleswap.toml")]
        config: String,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Quote a swap against arbitrary reserves
    Quote {
        /// Input amount in base units
        #[arg(long)]
        amount_in: Amount,

        /// Reserve of the input token
        #[arg(long)]
        reserve_in: Amount,

        /// Reserve of the output token
        #[arg(long)]
        reserve_out: Amount,

        /// Fee in basis points
        #[arg(long, default_value = "30")]
        fee_bps: u16,
    },

    /// Random trading with invariant checks after every operation
    Fuzz {
        /// Number of operations
        #[arg(short, long, default_value = "1000")]
        trades: usize,

        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of trading accounts
        #[arg(long, default_value = "4")]
        traders: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for reports
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "swap_simulator={0},simpleswap={0},liquidity={0},token_ledger={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { output, force } => {
            init_scenario(&output, force)?;
        }
        Commands::Run { config, json } => {
            run_scenario(&config, json).await?;
        }
        Commands::Quote {
            amount_in,
            reserve_in,
            reserve_out,
            fee_bps,
        } => {
            quote(&amount_in, &reserve_in, &reserve_out, fee_bps)?;
        }
        Commands::Fuzz {
            trades,
            seed,
            traders,
        } => {
            run_fuzz(trades, seed, traders).await?;
        }
    }

    Ok(())
}

fn init_scenario(output: &str, force: bool) -> anyhow::Result<()> {
    if std::path::Path::new(output).exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", output);
    }

    SimulatorConfig::default().to_file(output)?;
    tracing::info!("Scenario written to {}", output);
    Ok(())
}

async fn run_scenario(config_path: &str, json: bool) -> anyhow::Result<()> {
    tracing::info!("Loading scenario from {}", config_path);
    let config = SimulatorConfig::from_file(config_path)?;

    let simulation = Simulation::new(&config)?;
    let report = simulation.run(&config.steps).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for step in &report.steps {
            match (&step.result, &step.error) {
                (Some(result), _) => {
                    println!("[{:>3}] {:<16} ok   {}", step.index, step.action, result)
                }
                (None, Some(error)) => {
                    println!("[{:>3}] {:<16} FAIL {}", step.index, step.action, error)
                }
                (None, None) => println!("[{:>3}] {:<16} ok", step.index, step.action),
            }
        }
        println!(
            "reserves: {} {} / {} {}",
            report.final_state.reserve_a,
            report.token_a.symbol,
            report.final_state.reserve_b,
            report.token_b.symbol
        );
        println!("total shares: {}", report.final_state.total_shares);
        if let Some(price) = &report.price_a_to_b {
            println!("price {}->{}: {}", report.token_a.symbol, report.token_b.symbol, price);
        }
    }

    let failed = report.failed_steps();
    if failed > 0 {
        tracing::warn!("{} of {} steps failed", failed, report.steps.len());
    }
    Ok(())
}

fn quote(
    amount_in: &Amount,
    reserve_in: &Amount,
    reserve_out: &Amount,
    fee_bps: u16,
) -> anyhow::Result<()> {
    let config = PoolConfig {
        fee_bps,
        ..PoolConfig::default()
    };
    config.validate()?;

    let quote = math::swap_quote(amount_in, reserve_in, reserve_out, config.fee_bps)?;
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn run_fuzz(trades: usize, seed: u64, traders: usize) -> anyhow::Result<()> {
    tracing::info!("Fuzzing {} operations with seed {}", trades, seed);
    let summary = fuzz(FuzzConfig {
        trades,
        seed,
        traders,
        ..FuzzConfig::default()
    })
    .await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
