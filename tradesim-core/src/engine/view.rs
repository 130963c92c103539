//! Read-only window onto engine state, handed to strategies.

use crate::domain::{FillEvent, LastPriceTable, PortfolioLedger};

/// Shared borrows of the ledger, price table and trade log. Holding a view
/// makes mutation of the ledger impossible for the view's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct EngineView<'a> {
    ledger: &'a PortfolioLedger,
    prices: &'a LastPriceTable,
    trades: &'a [FillEvent],
}

impl<'a> EngineView<'a> {
    pub fn new(
        ledger: &'a PortfolioLedger,
        prices: &'a LastPriceTable,
        trades: &'a [FillEvent],
    ) -> Self {
        Self {
            ledger,
            prices,
            trades,
        }
    }

    pub fn cash(&self) -> f64 {
        self.ledger.cash()
    }

    pub fn initial_capital(&self) -> f64 {
        self.ledger.initial_capital()
    }

    /// Quantity held, zero if absent.
    pub fn position(&self, symbol: &str) -> f64 {
        self.ledger.position(symbol)
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol)
    }

    pub fn equity(&self) -> f64 {
        self.ledger.equity(self.prices)
    }

    pub fn trades(&self) -> &'a [FillEvent] {
        self.trades
    }

    pub fn ledger(&self) -> &'a PortfolioLedger {
        self.ledger
    }

    pub fn prices(&self) -> &'a LastPriceTable {
        self.prices
    }
}
