//! Wires together config, data loading and the engine.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads CSV data, then runs. Used by the CLI.
//! - `run_backtest_from_events()`: takes pre-loaded events, no I/O.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use tradesim_core::data::{dataset_hash, load_csv, DataError};
use tradesim_core::domain::{FillEvent, MarketEvent};
use tradesim_core::engine::{run_backtest, EngineError, RejectedOrder};
use tradesim_core::report::BacktestReport;
use tradesim_core::strategy::StrategyError;

use crate::config::{BacktestConfig, ConfigError, RunId};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("no market data: pass a CSV path or set backtest.data in the config")]
    NoDataSource,
}

/// Current schema version for serialized results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub strategy: String,
    pub event_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data_path: Option<PathBuf>,
    pub report: BacktestReport,
    pub trades: Vec<FillEvent>,
    pub rejected_orders: Vec<RejectedOrder>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Resolve the data path: an explicit path wins over `backtest.data`.
pub fn resolve_data_path(
    config: &BacktestConfig,
    data_override: Option<&Path>,
) -> Result<PathBuf, RunError> {
    data_override
        .or(config.backtest.data.as_deref())
        .map(Path::to_path_buf)
        .ok_or(RunError::NoDataSource)
}

/// Run a single backtest, loading market data from CSV.
pub fn run_single_backtest(
    config: &BacktestConfig,
    data_override: Option<&Path>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let path = resolve_data_path(config, data_override)?;
    let events = load_csv(&path)?;
    info!(path = %path.display(), events = events.len(), "loaded market data");

    let mut result = run_backtest_from_events(config, events)?;
    result.data_path = Some(path);
    Ok(result)
}

/// Run a backtest over pre-loaded events. No I/O.
pub fn run_backtest_from_events(
    config: &BacktestConfig,
    events: Vec<MarketEvent>,
) -> Result<BacktestResult, RunError> {
    let run_id = config.run_id()?;
    let dataset_hash = dataset_hash(&events);
    let event_count = events.len();
    let strategy = config.strategy.build()?;
    let strategy_name = strategy.name().to_string();

    info!(
        run_id = %run_id,
        dataset_hash = %dataset_hash,
        strategy = %strategy_name,
        "running backtest"
    );
    let result = run_backtest(config.to_engine_config(), events, strategy)?;

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash,
        strategy: strategy_name,
        event_count,
        data_path: None,
        report: result.report,
        trades: result.trades,
        rejected_orders: result.rejected_orders,
    })
}
