//! Run summary computed from the final ledger and trade log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{FillEvent, LastPriceTable, OrderSide, PortfolioLedger};

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub total_trades: usize,
    pub total_commission: f64,
    /// `Σ slippage_amount * quantity` across fills.
    pub total_slippage_cost: f64,
    /// `cash + Σ position * last price`.
    pub final_portfolio_value: f64,
    pub pnl: f64,
    pub roi_pct: f64,

    pub initial_capital: f64,
    pub final_cash: f64,
    pub buy_fills: usize,
    pub sell_fills: usize,
    pub rejected_orders: usize,
    pub dropped_signals: usize,
    /// Orders for a symbol with no observed price.
    pub dropped_orders: usize,
    pub open_positions: BTreeMap<String, f64>,
}

/// Counters the engine tracks outside the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub rejected_orders: usize,
    pub dropped_signals: usize,
    pub dropped_orders: usize,
}

impl BacktestReport {
    /// Aggregate; never mutates its inputs.
    pub fn generate(
        ledger: &PortfolioLedger,
        prices: &LastPriceTable,
        trades: &[FillEvent],
        counters: RunCounters,
    ) -> Self {
        let total_commission: f64 = trades.iter().map(FillEvent::commission).sum();
        let total_slippage_cost: f64 = trades.iter().map(FillEvent::slippage_cost).sum();
        let buy_fills = trades
            .iter()
            .filter(|t| t.side() == OrderSide::Buy)
            .count();

        let initial_capital = ledger.initial_capital();
        let final_portfolio_value = ledger.equity(prices);
        let pnl = final_portfolio_value - initial_capital;
        let roi_pct = if initial_capital > 0.0 {
            pnl / initial_capital * 100.0
        } else {
            0.0
        };

        Self {
            total_trades: trades.len(),
            total_commission,
            total_slippage_cost,
            final_portfolio_value,
            pnl,
            roi_pct,
            initial_capital,
            final_cash: ledger.cash(),
            buy_fills,
            sell_fills: trades.len() - buy_fills,
            rejected_orders: counters.rejected_orders,
            dropped_signals: counters.dropped_signals,
            dropped_orders: counters.dropped_orders,
            open_positions: ledger.positions().clone(),
        }
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Backtest Report ---")?;
        writeln!(
            f,
            "Total Trades:          {} ({} buy / {} sell)",
            self.total_trades, self.buy_fills, self.sell_fills
        )?;
        writeln!(f, "Final Portfolio Value: ${:.2}", self.final_portfolio_value)?;
        writeln!(f, "Total PnL:             ${:.2} ({:.2}%)", self.pnl, self.roi_pct)?;
        writeln!(f, "Total Fees Paid:       ${:.2}", self.total_commission)?;
        writeln!(f, "Est. Slippage Cost:    ${:.2}", self.total_slippage_cost)?;
        writeln!(f, "Final Cash:            ${:.2}", self.final_cash)?;
        writeln!(f, "Rejected Orders:       {}", self.rejected_orders)?;
        writeln!(f, "Dropped Signals:       {}", self.dropped_signals)?;
        writeln!(f, "Dropped Orders:        {}", self.dropped_orders)?;
        for (symbol, qty) in &self.open_positions {
            writeln!(f, "Open Position:         {symbol} {qty:.6}")?;
        }
        write!(f, "-----------------------")
    }
}
