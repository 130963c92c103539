//! Moving Average Crossover strategy
//!
//! Classic trend-following logic, tracked per symbol:
//! - Buy when fast SMA crosses above slow SMA
//! - Sell when fast SMA crosses below slow SMA
//! - Nothing otherwise

use std::collections::{HashMap, VecDeque};

use crate::domain::{MarketEvent, SignalEvent};
use crate::engine::EngineView;
use crate::strategy::{Strategy, StrategyError};

/// Moving Average Crossover strategy
///
/// # Parameters
/// - `fast_period`: Short SMA period (e.g., 5)
/// - `slow_period`: Long SMA period (e.g., 20)
///
/// Sells are only emitted while a position is held; the engine would reject
/// them otherwise.
#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    fast_period: usize,
    slow_period: usize,
    history: HashMap<String, VecDeque<f64>>,
}

impl MovingAverageCross {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, StrategyError> {
        if fast_period == 0 {
            return Err(StrategyError::InvalidParameter(
                "fast_period must be > 0".into(),
            ));
        }
        if slow_period <= fast_period {
            return Err(StrategyError::InvalidParameter(format!(
                "slow_period ({slow_period}) must be > fast_period ({fast_period})"
            )));
        }
        Ok(Self {
            fast_period,
            slow_period,
            history: HashMap::new(),
        })
    }

    /// Simple moving average over the last `period` prices, skipping the
    /// newest `offset` entries.
    fn sma(prices: &VecDeque<f64>, period: usize, offset: usize) -> Option<f64> {
        let end = prices.len().checked_sub(offset)?;
        let start = end.checked_sub(period)?;
        let sum: f64 = prices.range(start..end).sum();
        Some(sum / period as f64)
    }

    /// Returns:
    /// - Some(true): bullish cross
    /// - Some(false): bearish cross
    /// - None: no cross or not enough data
    fn detect_cross(&self, prices: &VecDeque<f64>) -> Option<bool> {
        let fast_now = Self::sma(prices, self.fast_period, 0)?;
        let slow_now = Self::sma(prices, self.slow_period, 0)?;
        let fast_prev = Self::sma(prices, self.fast_period, 1)?;
        let slow_prev = Self::sma(prices, self.slow_period, 1)?;

        if fast_prev <= slow_prev && fast_now > slow_now {
            Some(true)
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            Some(false)
        } else {
            None
        }
    }
}

impl Strategy for MovingAverageCross {
    fn on_event(
        &mut self,
        view: &EngineView<'_>,
        event: &MarketEvent,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        let window = self.slow_period + 1;
        let prices = self.history.entry(event.symbol().to_string()).or_default();
        prices.push_back(event.price());
        if prices.len() > window {
            prices.pop_front();
        }

        let cross = self.detect_cross(&self.history[event.symbol()]);
        let signals = match cross {
            Some(true) => vec![SignalEvent::buy(event)],
            Some(false) if view.position(event.symbol()) > 0.0 => vec![SignalEvent::sell(event)],
            _ => Vec::new(),
        };
        Ok(signals)
    }

    fn name(&self) -> &str {
        "ma_crossover"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LastPriceTable, OrderSide, PortfolioLedger};
    use chrono::{DateTime, Utc};

    fn market(secs: i64, price: f64) -> MarketEvent {
        let ts: DateTime<Utc> = DateTime::from_timestamp(secs, 0).unwrap();
        MarketEvent::new(ts, "SPY", price, 1.0).unwrap()
    }

    fn feed(strategy: &mut MovingAverageCross, prices: &[f64]) -> Vec<Vec<SignalEvent>> {
        let ledger = PortfolioLedger::new(1_000.0);
        let table = LastPriceTable::new();
        let view = EngineView::new(&ledger, &table, &[]);
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| strategy.on_event(&view, &market(i as i64, *p)).unwrap())
            .collect()
    }

    #[test]
    fn invalid_periods_rejected() {
        assert!(MovingAverageCross::new(0, 5).is_err());
        assert!(MovingAverageCross::new(5, 5).is_err());
        assert!(MovingAverageCross::new(2, 4).is_ok());
    }

    #[test]
    fn silent_during_warmup() {
        let mut strategy = MovingAverageCross::new(2, 4).unwrap();
        let out = feed(&mut strategy, &[100.0, 101.0, 102.0, 103.0]);
        assert!(out.iter().all(|s| s.is_empty()));
    }

    #[test]
    fn bullish_cross_emits_buy() {
        let mut strategy = MovingAverageCross::new(2, 4).unwrap();
        // Falling then sharply rising: fast SMA crosses above slow SMA.
        let out = feed(&mut strategy, &[110.0, 108.0, 106.0, 104.0, 102.0, 115.0]);
        let last = out.last().unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].side(), OrderSide::Buy);
    }

    #[test]
    fn bearish_cross_without_position_is_silent() {
        let mut strategy = MovingAverageCross::new(2, 4).unwrap();
        let out = feed(&mut strategy, &[100.0, 102.0, 104.0, 106.0, 108.0, 95.0]);
        assert!(out.last().unwrap().is_empty());
    }
}
