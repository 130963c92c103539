//! TradeSim CLI — run and validate event-driven backtests.
//!
//! Commands:
//! - `run`: execute a backtest over CSV market data
//! - `validate`: check a config file (and optionally a data file) without running

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradesim_core::data::{dataset_hash, load_csv};
use tradesim_runner::{
    resolve_data_path, run_single_backtest, BacktestConfig, BacktestResult, StrategyConfig,
};

#[derive(Parser)]
#[command(
    name = "tradesim",
    version,
    about = "TradeSim CLI — event-driven backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest over CSV market data.
    Run {
        /// CSV with a timestamp,symbol,close,volume header. Overrides backtest.data.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy with default parameters: hold, buy_and_hold, ma_crossover, random.
        #[arg(long)]
        strategy: Option<String>,

        /// Seed for the random strategy.
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full result as JSON instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Validate a config file without running.
    Validate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Also parse this CSV file. Overrides backtest.data.
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradesim=info,tradesim_core=info,tradesim_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            config,
            strategy,
            seed,
            json,
        } => run_backtest_cmd(data, config, strategy, seed, json),
        Commands::Validate { config, data } => run_validate(config, data),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn run_backtest_cmd(
    data: Option<PathBuf>,
    config_path: Option<PathBuf>,
    strategy: Option<String>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    if let Some(name) = strategy {
        config.strategy = StrategyConfig::from_name(&name)?;
    }
    if let Some(seed) = seed {
        if !matches!(config.strategy, StrategyConfig::Random { .. }) {
            bail!("--seed only applies to the random strategy");
        }
        config = config.with_seed(seed);
    }

    let result = run_single_backtest(&config, data.as_deref())?;

    if json {
        println!("{}", result.to_json()?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn run_validate(config_path: PathBuf, data: Option<PathBuf>) -> Result<()> {
    let config = load_config(Some(&config_path))?;
    config.validate()?;
    println!("Config OK: {}", config_path.display());
    println!("Run ID:    {}", config.run_id()?);
    println!("Strategy:  {}", config.strategy.name());

    if data.is_none() && config.backtest.data.is_none() {
        return Ok(());
    }
    let path = resolve_data_path(&config, data.as_deref())?;
    let events = load_csv(&path).with_context(|| format!("loading data {}", path.display()))?;
    info!(events = events.len(), "data validated");
    println!("Data OK:   {} ({} events)", path.display(), events.len());
    println!("Dataset:   {}", dataset_hash(&events));
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!("Run ID:   {}", result.run_id);
    println!("Strategy: {}", result.strategy);
    println!("Events:   {}", result.event_count);
    println!("Dataset:  {}", result.dataset_hash);
    println!();
    println!("{}", result.report);

    if !result.rejected_orders.is_empty() {
        println!();
        println!("Rejected orders:");
        for rejected in &result.rejected_orders {
            println!(
                "  {} {} {} {:.6}: {}",
                rejected.order.timestamp(),
                rejected.order.side(),
                rejected.order.symbol(),
                rejected.order.quantity(),
                rejected.reason
            );
        }
    }
}
