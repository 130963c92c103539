//! Last-known price per symbol, fed only by market events.

use super::event::MarketEvent;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastPriceTable {
    prices: BTreeMap<String, f64>,
}

impl LastPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the price for the event's symbol.
    pub fn record(&mut self, event: &MarketEvent) {
        self.prices.insert(event.symbol().to_string(), event.price());
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.prices.iter().map(|(s, p)| (s.as_str(), *p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn market(symbol: &str, price: f64) -> MarketEvent {
        let ts: DateTime<Utc> = DateTime::from_timestamp(0, 0).unwrap();
        MarketEvent::new(ts, symbol, price, 1.0).unwrap()
    }

    #[test]
    fn latest_observation_wins() {
        let mut table = LastPriceTable::new();
        assert_eq!(table.get("BTC"), None);

        table.record(&market("BTC", 100.0));
        table.record(&market("ETH", 10.0));
        table.record(&market("BTC", 105.0));

        assert_eq!(table.get("BTC"), Some(105.0));
        assert_eq!(table.get("ETH"), Some(10.0));
        assert_eq!(table.len(), 2);
    }
}
