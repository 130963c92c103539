//! Slippage and maker/taker commission.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive less (lower price).
//! Commission is charged on the slipped notional: maker rate for limit orders,
//! taker rate for market orders.

use serde::{Deserialize, Serialize};

use crate::domain::{FillEvent, OrderEvent, OrderSide, OrderType};

/// Cost model for execution friction (slippage + commission).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Fee rate for limit (liquidity-providing) orders.
    pub maker_fee: f64,
    /// Fee rate for market (liquidity-taking) orders.
    pub taker_fee: f64,
    /// Fractional adverse price adjustment applied to every execution.
    pub slippage_fraction: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            maker_fee: 0.001,
            taker_fee: 0.002,
            slippage_fraction: 0.0005,
        }
    }
}

impl CostModel {
    pub fn new(maker_fee: f64, taker_fee: f64, slippage_fraction: f64) -> Self {
        Self {
            maker_fee,
            taker_fee,
            slippage_fraction,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Apply slippage to a reference price.
    ///
    /// Returns `(executed_price, per_unit_slippage)`.
    pub fn apply_slippage(&self, reference_price: f64, side: OrderSide) -> (f64, f64) {
        let slippage = reference_price * self.slippage_fraction;
        match side {
            OrderSide::Buy => (reference_price * (1.0 + self.slippage_fraction), slippage),
            OrderSide::Sell => (reference_price * (1.0 - self.slippage_fraction), slippage),
        }
    }

    pub fn fee_rate(&self, order_type: OrderType) -> f64 {
        match order_type {
            OrderType::Market => self.taker_fee,
            OrderType::Limit { .. } => self.maker_fee,
        }
    }

    /// `commission = executed_price * quantity * fee_rate`
    pub fn compute_commission(&self, executed_price: f64, quantity: f64, order_type: OrderType) -> f64 {
        executed_price * quantity * self.fee_rate(order_type)
    }

    /// Price an order against the last known price.
    ///
    /// The returned fill has not been checked against the ledger; see
    /// [`crate::engine::execution::check_execution`].
    pub fn execute(&self, order: &OrderEvent, reference_price: f64) -> FillEvent {
        let (executed_price, slippage) = self.apply_slippage(reference_price, order.side());
        let commission = self.compute_commission(executed_price, order.quantity(), order.order_type());
        FillEvent::derive(order, executed_price, commission, slippage)
    }
}
