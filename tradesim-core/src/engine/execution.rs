//! Execution guard: decides whether a priced order may touch the ledger.
//!
//! Rejections are recoverable: the order is dropped, logged and recorded,
//! and the run continues. A rejected order never produces a fill.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{FillEvent, OrderEvent, OrderSide, OrderType, PortfolioLedger};

/// Why an order was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Buy whose total cost exceeds available cash.
    InsufficientCash { available: f64, required: f64 },
    /// Sell larger than the held position.
    InsufficientPosition { held: f64, requested: f64 },
    /// Limit order whose slippage-adjusted price is worse than its limit.
    LimitNotMarketable { limit_price: f64, executed_price: f64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::InsufficientCash {
                available,
                required,
            } => write!(
                f,
                "insufficient cash (available={available:.4}, required={required:.4})"
            ),
            RejectionReason::InsufficientPosition { held, requested } => write!(
                f,
                "insufficient position (held={held}, requested={requested})"
            ),
            RejectionReason::LimitNotMarketable {
                limit_price,
                executed_price,
            } => write!(
                f,
                "limit not marketable (limit={limit_price:.4}, executed={executed_price:.4})"
            ),
        }
    }
}

/// A rejected order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedOrder {
    pub order: OrderEvent,
    pub reason: RejectionReason,
}

/// Check a priced order against the ledger.
///
/// Buy: rejected if `cash < total_cost`. Sell: rejected if
/// `position < quantity`. Limit orders are additionally rejected when the
/// executed price is above (buy) or below (sell) the limit.
pub fn check_execution(
    ledger: &PortfolioLedger,
    order: &OrderEvent,
    fill: &FillEvent,
) -> Result<(), RejectionReason> {
    if let OrderType::Limit { limit_price } = order.order_type() {
        let executed_price = fill.executed_price();
        let crosses = match order.side() {
            OrderSide::Buy => executed_price <= limit_price,
            OrderSide::Sell => executed_price >= limit_price,
        };
        if !crosses {
            return Err(RejectionReason::LimitNotMarketable {
                limit_price,
                executed_price,
            });
        }
    }

    match order.side() {
        OrderSide::Buy => {
            if ledger.cash() < fill.total_cost() {
                return Err(RejectionReason::InsufficientCash {
                    available: ledger.cash(),
                    required: fill.total_cost(),
                });
            }
        }
        OrderSide::Sell => {
            let held = ledger.position(order.symbol());
            if held < order.quantity() {
                return Err(RejectionReason::InsufficientPosition {
                    held,
                    requested: order.quantity(),
                });
            }
        }
    }
    Ok(())
}
