//! Engine configuration and run result types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FillEvent, PortfolioLedger};
use crate::engine::cost_model::CostModel;
use crate::engine::execution::RejectedOrder;
use crate::report::BacktestReport;

/// A configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {value} ({reason})")]
pub struct EngineConfigError {
    pub field: &'static str,
    pub value: f64,
    pub reason: &'static str,
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub maker_fee: f64,
    pub taker_fee: f64,
    pub slippage_fraction: f64,
    /// Share of available cash committed to one signal-derived order.
    pub allocation_fraction: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let costs = CostModel::default();
        Self {
            initial_capital: 10_000.0,
            maker_fee: costs.maker_fee,
            taker_fee: costs.taker_fee,
            slippage_fraction: costs.slippage_fraction,
            allocation_fraction: 0.10,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    pub fn frictionless(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            maker_fee: 0.0,
            taker_fee: 0.0,
            slippage_fraction: 0.0,
            ..Self::default()
        }
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.maker_fee, self.taker_fee, self.slippage_fraction)
    }

    /// All values must be finite and non-negative. Fee and slippage rates
    /// must stay below 1 so that sell proceeds remain positive, and the
    /// allocation fraction cannot exceed 1.
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        let non_negative = [
            ("initial_capital", self.initial_capital),
            ("maker_fee", self.maker_fee),
            ("taker_fee", self.taker_fee),
            ("slippage_fraction", self.slippage_fraction),
            ("allocation_fraction", self.allocation_fraction),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineConfigError {
                    field,
                    value,
                    reason: "must be finite and >= 0",
                });
            }
        }

        let below_one = [
            ("maker_fee", self.maker_fee),
            ("taker_fee", self.taker_fee),
            ("slippage_fraction", self.slippage_fraction),
        ];
        for (field, value) in below_one {
            if value >= 1.0 {
                return Err(EngineConfigError {
                    field,
                    value,
                    reason: "must be < 1",
                });
            }
        }

        if self.allocation_fraction > 1.0 {
            return Err(EngineConfigError {
                field: "allocation_fraction",
                value: self.allocation_fraction,
                reason: "must be <= 1",
            });
        }
        Ok(())
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub report: BacktestReport,
    pub trades: Vec<FillEvent>,
    pub rejected_orders: Vec<RejectedOrder>,
    pub ledger: PortfolioLedger,
}
