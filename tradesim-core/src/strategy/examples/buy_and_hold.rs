//! Passive strategies: never trade, or buy once per symbol.

use std::collections::HashSet;

use crate::domain::{MarketEvent, SignalEvent};
use crate::engine::EngineView;
use crate::strategy::{Strategy, StrategyError};

/// Never emits a signal. Useful as a control run.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldStrategy;

impl Strategy for HoldStrategy {
    fn on_event(
        &mut self,
        _view: &EngineView<'_>,
        _event: &MarketEvent,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "hold"
    }
}

/// Buys on the first observation of each symbol, then holds.
#[derive(Debug, Clone, Default)]
pub struct BuyAndHold {
    entered: HashSet<String>,
}

impl BuyAndHold {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for BuyAndHold {
    fn on_event(
        &mut self,
        _view: &EngineView<'_>,
        event: &MarketEvent,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        if self.entered.insert(event.symbol().to_string()) {
            Ok(vec![SignalEvent::buy(event)])
        } else {
            Ok(Vec::new())
        }
    }

    fn name(&self) -> &str {
        "buy_and_hold"
    }
}
