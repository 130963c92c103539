//! Portfolio ledger: cash plus per-symbol position quantities.

use super::event::{FillEvent, OrderSide};
use super::prices::LastPriceTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A fill that would break a ledger invariant. The ledger is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("buy of {symbol} would overdraw cash: available {available:.6}, required {required:.6}")]
    InsufficientCash {
        symbol: String,
        available: f64,
        required: f64,
    },

    #[error("sell of {symbol} exceeds position: held {held}, requested {requested}")]
    InsufficientPosition {
        symbol: String,
        held: f64,
        requested: f64,
    },

    #[error("sell of {symbol} has negative proceeds {proceeds}")]
    NegativeProceeds { symbol: String, proceeds: f64 },

    #[error("invalid ledger state: {0}")]
    InvalidState(String),
}

/// Cash balance plus long-only position quantities.
///
/// `apply_fill` is the only mutation path. Invariants after every call:
/// `cash >= 0`, every stored quantity is `> 0` (a symbol that returns to
/// zero is removed), and absent symbols read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LedgerRecord")]
pub struct PortfolioLedger {
    initial_capital: f64,
    cash: f64,
    positions: BTreeMap<String, f64>,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Quantity held for `symbol`, zero if absent.
    pub fn position(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.position(symbol) > 0.0
    }

    pub fn positions(&self) -> &BTreeMap<String, f64> {
        &self.positions
    }

    /// Value of open positions at the given prices. A symbol without a price
    /// contributes zero.
    pub fn market_value(&self, prices: &LastPriceTable) -> f64 {
        self.positions
            .iter()
            .map(|(symbol, qty)| qty * prices.get(symbol).unwrap_or(0.0))
            .sum()
    }

    /// Mark-to-market equity: `cash + Σ position * last price`.
    pub fn equity(&self, prices: &LastPriceTable) -> f64 {
        self.cash + self.market_value(prices)
    }

    /// Apply a fill: buy → `cash -= total_cost`, `position += quantity`;
    /// sell → `cash += total_cost`, `position -= quantity`.
    pub fn apply_fill(&mut self, fill: &FillEvent) -> Result<(), LedgerError> {
        let symbol = fill.symbol();
        let held = self.position(symbol);

        match fill.side() {
            OrderSide::Buy => {
                let cash_after = self.cash - fill.total_cost();
                if cash_after < 0.0 || cash_after.is_nan() {
                    return Err(LedgerError::InsufficientCash {
                        symbol: symbol.to_string(),
                        available: self.cash,
                        required: fill.total_cost(),
                    });
                }
                self.cash = cash_after;
                self.positions
                    .insert(symbol.to_string(), held + fill.quantity());
            }
            OrderSide::Sell => {
                if held < fill.quantity() {
                    return Err(LedgerError::InsufficientPosition {
                        symbol: symbol.to_string(),
                        held,
                        requested: fill.quantity(),
                    });
                }
                if fill.total_cost() < 0.0 || fill.total_cost().is_nan() {
                    return Err(LedgerError::NegativeProceeds {
                        symbol: symbol.to_string(),
                        proceeds: fill.total_cost(),
                    });
                }
                self.cash += fill.total_cost();
                let remaining = held - fill.quantity();
                if remaining > 0.0 {
                    self.positions.insert(symbol.to_string(), remaining);
                } else {
                    self.positions.remove(symbol);
                }
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct LedgerRecord {
    initial_capital: f64,
    cash: f64,
    #[serde(default)]
    positions: BTreeMap<String, f64>,
}

impl TryFrom<LedgerRecord> for PortfolioLedger {
    type Error = LedgerError;

    fn try_from(r: LedgerRecord) -> Result<Self, Self::Error> {
        if !r.initial_capital.is_finite() || r.initial_capital < 0.0 {
            return Err(LedgerError::InvalidState(format!(
                "initial capital {}",
                r.initial_capital
            )));
        }
        if !r.cash.is_finite() || r.cash < 0.0 {
            return Err(LedgerError::InvalidState(format!("cash {}", r.cash)));
        }
        if let Some((symbol, qty)) = r
            .positions
            .iter()
            .find(|(symbol, qty)| symbol.trim().is_empty() || !qty.is_finite() || **qty <= 0.0)
        {
            return Err(LedgerError::InvalidState(format!(
                "position {symbol:?} = {qty}"
            )));
        }
        Ok(Self {
            initial_capital: r.initial_capital,
            cash: r.cash,
            positions: r.positions,
        })
    }
}
