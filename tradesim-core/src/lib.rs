//! TradeSim Core — event model, queue, ledger, costs, sizing and the backtest loop.
//!
//! This crate contains the whole simulation:
//! - Domain types (market, signal, order and fill events; ledger; last prices)
//! - A two-lane event queue with a single terminal marker
//! - Transaction cost model and execution guard
//! - Position sizers and the strategy callback trait
//! - Report generation over the final ledger and trade log
//! - CSV ingestion of historical market data

pub mod data;
pub mod domain;
pub mod engine;
pub mod report;
pub mod sizers;
pub mod strategy;

pub use engine::{run_backtest, Backtest, EngineConfig, EngineError, RunResult};
pub use report::BacktestReport;
