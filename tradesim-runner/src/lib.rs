//! TradeSim Runner — backtest orchestration on top of `tradesim-core`.
//!
//! This crate provides:
//! - TOML configuration with defaults for every field
//! - Strategy construction from configuration
//! - Single-backtest runner over CSV data or pre-loaded events
//! - Run fingerprinting (config run id, dataset hash)

pub mod config;
pub mod runner;

pub use config::{BacktestConfig, BacktestSection, ConfigError, CostsSection, RunId, StrategyConfig};
pub use runner::{
    resolve_data_path, run_backtest_from_events, run_single_backtest, BacktestResult, RunError,
    SCHEMA_VERSION,
};
