//! Strategy callback, invoked once per market event.
//!
//! Strategies see the engine only through an [`EngineView`] and answer with
//! zero or more [`SignalEvent`]s. They cannot size orders or touch the ledger.

pub mod examples;

pub use examples::{BuyAndHold, HoldStrategy, MovingAverageCross, RandomStrategy};

use thiserror::Error;

use crate::domain::{EventError, MarketEvent, SignalEvent};
use crate::engine::EngineView;

/// A strategy failure. Aborts the run; the engine never retries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid signal: {0}")]
    InvalidSignal(#[from] EventError),

    #[error("{0}")]
    Failed(String),
}

/// Decision logic fed by market observations.
pub trait Strategy {
    /// React to one market observation.
    fn on_event(
        &mut self,
        view: &EngineView<'_>,
        event: &MarketEvent,
    ) -> Result<Vec<SignalEvent>, StrategyError>;

    /// Strategy name for logging and reports.
    fn name(&self) -> &str;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn on_event(
        &mut self,
        view: &EngineView<'_>,
        event: &MarketEvent,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        (**self).on_event(view, event)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Strategy backed by a closure.
pub struct FnStrategy<F> {
    name: String,
    f: F,
}

impl<F> Strategy for FnStrategy<F>
where
    F: FnMut(&EngineView<'_>, &MarketEvent) -> Result<Vec<SignalEvent>, StrategyError>,
{
    fn on_event(
        &mut self,
        view: &EngineView<'_>,
        event: &MarketEvent,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        (self.f)(view, event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as a named strategy.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnStrategy<F>
where
    F: FnMut(&EngineView<'_>, &MarketEvent) -> Result<Vec<SignalEvent>, StrategyError>,
{
    FnStrategy {
        name: name.into(),
        f,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LastPriceTable, PortfolioLedger};
    use chrono::{DateTime, Utc};

    #[test]
    fn closure_strategy_sees_read_only_state() {
        let ledger = PortfolioLedger::new(500.0);
        let prices = LastPriceTable::new();
        let view = EngineView::new(&ledger, &prices, &[]);

        let mut strategy = from_fn("cash_gate", |view, event| {
            if view.cash() > 1_000.0 {
                Ok(vec![SignalEvent::buy(event)])
            } else {
                Ok(Vec::new())
            }
        });

        let ts: DateTime<Utc> = DateTime::from_timestamp(0, 0).unwrap();
        let market = MarketEvent::new(ts, "BTC", 10.0, 1.0).unwrap();
        assert!(strategy.on_event(&view, &market).unwrap().is_empty());
        assert_eq!(strategy.name(), "cash_gate");
    }

    #[test]
    fn boxed_strategy_delegates() {
        let mut boxed: Box<dyn Strategy> = Box::new(HoldStrategy);
        assert_eq!(boxed.name(), "hold");

        let ledger = PortfolioLedger::new(500.0);
        let prices = LastPriceTable::new();
        let view = EngineView::new(&ledger, &prices, &[]);
        let ts: DateTime<Utc> = DateTime::from_timestamp(0, 0).unwrap();
        let market = MarketEvent::new(ts, "BTC", 10.0, 1.0).unwrap();
        assert!(boxed.on_event(&view, &market).unwrap().is_empty());
    }

    #[test]
    fn event_error_converts_to_strategy_error() {
        let ts: DateTime<Utc> = DateTime::from_timestamp(0, 0).unwrap();
        let result: Result<SignalEvent, StrategyError> =
            SignalEvent::new(ts, "BTC", crate::domain::OrderSide::Buy, 2.0).map_err(Into::into);
        assert!(matches!(result, Err(StrategyError::InvalidSignal(_))));
    }
}
