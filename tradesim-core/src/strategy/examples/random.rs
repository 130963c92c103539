//! Seeded coin-flip strategy for smoke runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{MarketEvent, OrderSide, SignalEvent};
use crate::engine::EngineView;
use crate::strategy::{Strategy, StrategyError};

/// On each observation, with probability `probability`, emits one signal
/// whose side is a fair coin flip. Deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    probability: f64,
    strength: f64,
    rng: StdRng,
}

impl RandomStrategy {
    pub const DEFAULT_PROBABILITY: f64 = 0.05;
    pub const DEFAULT_STRENGTH: f64 = 0.8;

    pub fn new(probability: f64, strength: f64, seed: u64) -> Result<Self, StrategyError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(StrategyError::InvalidParameter(format!(
                "probability must be in [0.0, 1.0], got {probability}"
            )));
        }
        if !(0.0..=1.0).contains(&strength) {
            return Err(StrategyError::InvalidParameter(format!(
                "strength must be in [0.0, 1.0], got {strength}"
            )));
        }
        Ok(Self {
            probability,
            strength,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            probability: Self::DEFAULT_PROBABILITY,
            strength: Self::DEFAULT_STRENGTH,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Strategy for RandomStrategy {
    fn on_event(
        &mut self,
        _view: &EngineView<'_>,
        event: &MarketEvent,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        if !self.rng.gen_bool(self.probability) {
            return Ok(Vec::new());
        }
        let side = if self.rng.gen_bool(0.5) {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        let signal = SignalEvent::new(event.timestamp(), event.symbol(), side, self.strength)?;
        Ok(vec![signal])
    }

    fn name(&self) -> &str {
        "random"
    }
}
