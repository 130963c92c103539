//! Backtesting engine — event queue, execution and the dispatch loop.
//!
//! One run owns one queue, one ledger and one strategy. Events are processed
//! strictly one at a time:
//!
//! 1. Market: update last prices, call the strategy
//! 2. Signal: size into a market order
//! 3. Order: price through the cost model, guard against the ledger
//! 4. Fill: apply to the ledger

pub mod cost_model;
pub mod execution;
pub mod loop_runner;
pub mod queue;
pub mod state;
pub mod view;

pub use cost_model::CostModel;
pub use execution::{check_execution, RejectedOrder, RejectionReason};
pub use loop_runner::{run_backtest, Backtest, EngineError, StepOutcome};
pub use queue::{EventQueue, QueueError, QueueItem};
pub use state::{EngineConfig, EngineConfigError, RunResult};
pub use view::EngineView;
