//! Capital-fraction sizer
//!
//! `quantity = (cash * allocation_fraction) / price`

use crate::domain::SignalEvent;
use crate::sizers::Sizer;

/// Commits a fixed fraction of available cash to each order, regardless of
/// side or signal strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationSizer {
    allocation_fraction: f64,
}

impl Default for AllocationSizer {
    fn default() -> Self {
        Self {
            allocation_fraction: 0.10,
        }
    }
}

impl AllocationSizer {
    pub fn new(allocation_fraction: f64) -> Self {
        Self {
            allocation_fraction,
        }
    }

    pub fn allocation_fraction(&self) -> f64 {
        self.allocation_fraction
    }
}

impl Sizer for AllocationSizer {
    fn size(&self, cash: f64, _signal: &SignalEvent, price: f64) -> f64 {
        if price <= 0.0 || cash <= 0.0 {
            return 0.0;
        }
        (cash * self.allocation_fraction) / price
    }

    fn name(&self) -> &str {
        "allocation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use chrono::{DateTime, Utc};

    fn signal(side: OrderSide, strength: f64) -> SignalEvent {
        let ts: DateTime<Utc> = DateTime::from_timestamp(0, 0).unwrap();
        SignalEvent::new(ts, "SPY", side, strength).unwrap()
    }

    #[test]
    fn test_default_ten_percent() {
        let sizer = AllocationSizer::default();
        let qty = sizer.size(10_000.0, &signal(OrderSide::Buy, 1.0), 100.0);
        assert_eq!(qty, 10.0);
    }

    #[test]
    fn test_strength_does_not_change_size() {
        let sizer = AllocationSizer::new(0.25);
        let weak = sizer.size(8_000.0, &signal(OrderSide::Buy, 0.1), 50.0);
        let strong = sizer.size(8_000.0, &signal(OrderSide::Buy, 1.0), 50.0);
        assert_eq!(weak, strong);
        assert_eq!(strong, 40.0);
    }

    #[test]
    fn test_sell_sized_from_cash() {
        let sizer = AllocationSizer::default();
        assert_eq!(sizer.size(1_000.0, &signal(OrderSide::Sell, 0.5), 20.0), 5.0);
    }

    #[test]
    fn test_zero_cash_returns_zero() {
        let sizer = AllocationSizer::default();
        assert_eq!(sizer.size(0.0, &signal(OrderSide::Buy, 1.0), 100.0), 0.0);
    }
}
