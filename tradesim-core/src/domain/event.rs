//! Event model: market, signal, order and fill.
//!
//! Every event carries a timestamp. Market events come from the historical
//! dataset; signals, orders and fills are produced while the engine runs.
//! Constructors validate the per-variant invariants, so a value of any of
//! these types is always well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Trade direction. Long-only: a sell can only reduce an existing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderType {
    /// Takes liquidity at the last known price (taker fee).
    Market,
    /// Provides liquidity; fills only at `limit_price` or better (maker fee).
    Limit { limit_price: f64 },
}

impl OrderType {
    pub fn is_limit(&self) -> bool {
        matches!(self, OrderType::Limit { .. })
    }

    pub fn limit_price(&self) -> Option<f64> {
        match self {
            OrderType::Market => None,
            OrderType::Limit { limit_price } => Some(*limit_price),
        }
    }
}

/// Invariant violations raised by the event constructors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("volume must be non-negative and finite, got {0}")]
    InvalidVolume(f64),

    #[error("strength must be in [0.0, 1.0], got {0}")]
    InvalidStrength(f64),

    #[error("quantity must be positive and finite, got {0}")]
    InvalidQuantity(f64),

    #[error("limit price must be positive and finite, got {0}")]
    InvalidLimitPrice(f64),

    #[error("commission must be non-negative and finite, got {0}")]
    InvalidCommission(f64),

    #[error("slippage must be non-negative and finite, got {0}")]
    InvalidSlippage(f64),

    #[error("total cost {given} does not match executed price, quantity and commission ({derived})")]
    TotalCostMismatch { given: f64, derived: f64 },
}

fn check_symbol(symbol: &str) -> Result<(), EventError> {
    if symbol.trim().is_empty() {
        return Err(EventError::EmptySymbol);
    }
    Ok(())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// One historical observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MarketRecord")]
pub struct MarketEvent {
    timestamp: DateTime<Utc>,
    symbol: String,
    price: f64,
    volume: f64,
}

impl MarketEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        price: f64,
        volume: f64,
    ) -> Result<Self, EventError> {
        let symbol = symbol.into();
        check_symbol(&symbol)?;
        if !is_positive(price) {
            return Err(EventError::InvalidPrice(price));
        }
        if !is_non_negative(volume) {
            return Err(EventError::InvalidVolume(volume));
        }
        Ok(Self {
            timestamp,
            symbol,
            price,
            volume,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// A strategy's wish to trade. Strength is advisory and never sets size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalRecord")]
pub struct SignalEvent {
    timestamp: DateTime<Utc>,
    symbol: String,
    side: OrderSide,
    strength: f64,
}

impl SignalEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        side: OrderSide,
        strength: f64,
    ) -> Result<Self, EventError> {
        let symbol = symbol.into();
        check_symbol(&symbol)?;
        if !(0.0..=1.0).contains(&strength) {
            return Err(EventError::InvalidStrength(strength));
        }
        Ok(Self {
            timestamp,
            symbol,
            side,
            strength,
        })
    }

    /// Full-strength buy signal for the symbol of `market`, at its timestamp.
    pub fn buy(market: &MarketEvent) -> Self {
        Self {
            timestamp: market.timestamp,
            symbol: market.symbol.clone(),
            side: OrderSide::Buy,
            strength: 1.0,
        }
    }

    /// Full-strength sell signal for the symbol of `market`, at its timestamp.
    pub fn sell(market: &MarketEvent) -> Self {
        Self {
            timestamp: market.timestamp,
            symbol: market.symbol.clone(),
            side: OrderSide::Sell,
            strength: 1.0,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }
}

/// A concrete instruction to trade `quantity` units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderRecord")]
pub struct OrderEvent {
    timestamp: DateTime<Utc>,
    symbol: String,
    side: OrderSide,
    quantity: f64,
    order_type: OrderType,
}

impl OrderEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        order_type: OrderType,
    ) -> Result<Self, EventError> {
        let symbol = symbol.into();
        check_symbol(&symbol)?;
        if !is_positive(quantity) {
            return Err(EventError::InvalidQuantity(quantity));
        }
        if let OrderType::Limit { limit_price } = order_type {
            if !is_positive(limit_price) {
                return Err(EventError::InvalidLimitPrice(limit_price));
            }
        }
        Ok(Self {
            timestamp,
            symbol,
            side,
            quantity,
            order_type,
        })
    }

    pub fn market(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
    ) -> Result<Self, EventError> {
        Self::new(timestamp, symbol, side, quantity, OrderType::Market)
    }

    pub fn limit(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        limit_price: f64,
    ) -> Result<Self, EventError> {
        Self::new(
            timestamp,
            symbol,
            side,
            quantity,
            OrderType::Limit { limit_price },
        )
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }
}

/// The realized result of executing an order.
///
/// Only the cost model builds fills, so `total_cost` is always derived from
/// the executed price, quantity and commission. Deserialized fills are
/// re-derived and rejected if the stored total disagrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FillRecord")]
pub struct FillEvent {
    timestamp: DateTime<Utc>,
    symbol: String,
    side: OrderSide,
    quantity: f64,
    executed_price: f64,
    commission: f64,
    /// Per-unit adverse price adjustment.
    slippage_amount: f64,
    total_cost: f64,
}

impl FillEvent {
    pub(crate) fn derive(
        order: &OrderEvent,
        executed_price: f64,
        commission: f64,
        slippage_amount: f64,
    ) -> Self {
        let total_cost = Self::total_for(order.side, order.quantity, executed_price, commission);
        Self {
            timestamp: order.timestamp,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            executed_price,
            commission,
            slippage_amount,
            total_cost,
        }
    }

    fn total_for(side: OrderSide, quantity: f64, executed_price: f64, commission: f64) -> f64 {
        let notional = executed_price * quantity;
        match side {
            OrderSide::Buy => notional + commission,
            OrderSide::Sell => notional - commission,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn executed_price(&self) -> f64 {
        self.executed_price
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn slippage_amount(&self) -> f64 {
        self.slippage_amount
    }

    /// Cash paid (buy) or received (sell), commission included.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Dollar cost of slippage on this fill.
    pub fn slippage_cost(&self) -> f64 {
        self.slippage_amount * self.quantity
    }
}

// Wire shapes. Deserialization goes through these so the constructors'
// checks apply to events read from JSON as well.

#[derive(Deserialize)]
struct MarketRecord {
    timestamp: DateTime<Utc>,
    symbol: String,
    price: f64,
    #[serde(default)]
    volume: f64,
}

impl TryFrom<MarketRecord> for MarketEvent {
    type Error = EventError;

    fn try_from(r: MarketRecord) -> Result<Self, Self::Error> {
        MarketEvent::new(r.timestamp, r.symbol, r.price, r.volume)
    }
}

#[derive(Deserialize)]
struct SignalRecord {
    timestamp: DateTime<Utc>,
    symbol: String,
    side: OrderSide,
    strength: f64,
}

impl TryFrom<SignalRecord> for SignalEvent {
    type Error = EventError;

    fn try_from(r: SignalRecord) -> Result<Self, Self::Error> {
        SignalEvent::new(r.timestamp, r.symbol, r.side, r.strength)
    }
}

#[derive(Deserialize)]
struct OrderRecord {
    timestamp: DateTime<Utc>,
    symbol: String,
    side: OrderSide,
    quantity: f64,
    order_type: OrderType,
}

impl TryFrom<OrderRecord> for OrderEvent {
    type Error = EventError;

    fn try_from(r: OrderRecord) -> Result<Self, Self::Error> {
        OrderEvent::new(r.timestamp, r.symbol, r.side, r.quantity, r.order_type)
    }
}

#[derive(Deserialize)]
struct FillRecord {
    timestamp: DateTime<Utc>,
    symbol: String,
    side: OrderSide,
    quantity: f64,
    executed_price: f64,
    commission: f64,
    slippage_amount: f64,
    total_cost: f64,
}

impl TryFrom<FillRecord> for FillEvent {
    type Error = EventError;

    fn try_from(r: FillRecord) -> Result<Self, Self::Error> {
        check_symbol(&r.symbol)?;
        if !is_positive(r.quantity) {
            return Err(EventError::InvalidQuantity(r.quantity));
        }
        if !is_positive(r.executed_price) {
            return Err(EventError::InvalidPrice(r.executed_price));
        }
        if !is_non_negative(r.commission) {
            return Err(EventError::InvalidCommission(r.commission));
        }
        if !is_non_negative(r.slippage_amount) {
            return Err(EventError::InvalidSlippage(r.slippage_amount));
        }
        let derived = FillEvent::total_for(r.side, r.quantity, r.executed_price, r.commission);
        // Relative tolerance absorbs float text round-tripping.
        let tolerance = 1e-9 * derived.abs().max(1.0);
        if r.total_cost.is_nan() || (r.total_cost - derived).abs() > tolerance {
            return Err(EventError::TotalCostMismatch {
                given: r.total_cost,
                derived,
            });
        }
        Ok(FillEvent {
            timestamp: r.timestamp,
            symbol: r.symbol,
            side: r.side,
            quantity: r.quantity,
            executed_price: r.executed_price,
            commission: r.commission,
            slippage_amount: r.slippage_amount,
            total_cost: derived,
        })
    }
}

/// Discriminant of [`Event`], used for logging and step reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Market => write!(f, "MARKET"),
            EventKind::Signal => write!(f, "SIGNAL"),
            EventKind::Order => write!(f, "ORDER"),
            EventKind::Fill => write!(f, "FILL"),
        }
    }
}

/// Closed set of simulation events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::Market(e) => e.timestamp(),
            Event::Signal(e) => e.timestamp(),
            Event::Order(e) => e.timestamp(),
            Event::Fill(e) => e.timestamp(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Event::Market(e) => e.symbol(),
            Event::Signal(e) => e.symbol(),
            Event::Order(e) => e.symbol(),
            Event::Fill(e) => e.symbol(),
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(event: MarketEvent) -> Self {
        Event::Market(event)
    }
}

impl From<SignalEvent> for Event {
    fn from(event: SignalEvent) -> Self {
        Event::Signal(event)
    }
}

impl From<OrderEvent> for Event {
    fn from(event: OrderEvent) -> Self {
        Event::Order(event)
    }
}

impl From<FillEvent> for Event {
    fn from(event: FillEvent) -> Self {
        Event::Fill(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_153_600, 0).unwrap()
    }

    #[test]
    fn market_event_rejects_non_positive_price() {
        assert_eq!(
            MarketEvent::new(ts(), "BTC", 0.0, 1.0),
            Err(EventError::InvalidPrice(0.0))
        );
        assert!(MarketEvent::new(ts(), "BTC", -5.0, 1.0).is_err());
        assert!(MarketEvent::new(ts(), "BTC", f64::NAN, 1.0).is_err());
    }

    #[test]
    fn market_event_rejects_negative_volume() {
        assert_eq!(
            MarketEvent::new(ts(), "BTC", 100.0, -1.0),
            Err(EventError::InvalidVolume(-1.0))
        );
        assert!(MarketEvent::new(ts(), "BTC", 100.0, 0.0).is_ok());
    }

    #[test]
    fn empty_symbol_rejected() {
        assert_eq!(
            MarketEvent::new(ts(), "  ", 100.0, 1.0),
            Err(EventError::EmptySymbol)
        );
    }

    #[test]
    fn signal_strength_bounds() {
        assert!(SignalEvent::new(ts(), "BTC", OrderSide::Buy, 0.0).is_ok());
        assert!(SignalEvent::new(ts(), "BTC", OrderSide::Buy, 1.0).is_ok());
        assert_eq!(
            SignalEvent::new(ts(), "BTC", OrderSide::Buy, 1.5),
            Err(EventError::InvalidStrength(1.5))
        );
    }

    #[test]
    fn order_quantity_must_be_positive() {
        assert_eq!(
            OrderEvent::market(ts(), "BTC", OrderSide::Buy, 0.0),
            Err(EventError::InvalidQuantity(0.0))
        );
        assert!(OrderEvent::market(ts(), "BTC", OrderSide::Sell, -3.0).is_err());
    }

    #[test]
    fn limit_order_requires_valid_price() {
        assert_eq!(
            OrderEvent::limit(ts(), "BTC", OrderSide::Buy, 1.0, 0.0),
            Err(EventError::InvalidLimitPrice(0.0))
        );
        let order = OrderEvent::limit(ts(), "BTC", OrderSide::Buy, 1.0, 99.0).unwrap();
        assert!(order.order_type().is_limit());
        assert_eq!(order.order_type().limit_price(), Some(99.0));
    }

    #[test]
    fn fill_total_cost_is_derived_from_side() {
        let buy = OrderEvent::market(ts(), "BTC", OrderSide::Buy, 10.0).unwrap();
        let fill = FillEvent::derive(&buy, 100.0, 2.0, 0.05);
        assert_eq!(fill.total_cost(), 1002.0);

        let sell = OrderEvent::market(ts(), "BTC", OrderSide::Sell, 10.0).unwrap();
        let fill = FillEvent::derive(&sell, 100.0, 2.0, 0.05);
        assert_eq!(fill.total_cost(), 998.0);
        assert!((fill.slippage_cost() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn event_kind_dispatch() {
        let market = MarketEvent::new(ts(), "ETH", 2000.0, 5.0).unwrap();
        let signal = SignalEvent::buy(&market);
        assert_eq!(Event::from(market.clone()).kind(), EventKind::Market);
        assert_eq!(Event::from(signal).kind(), EventKind::Signal);
        assert_eq!(Event::from(market).symbol(), "ETH");
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let market = MarketEvent::new(ts(), "ETH", 2000.0, 5.0).unwrap();
        let json = serde_json::to_string(&Event::from(market)).unwrap();
        assert!(json.contains("\"type\":\"MARKET\""));
        assert!(json.contains("\"symbol\":\"ETH\""));
    }

    #[test]
    fn negative_price_market_json_is_rejected() {
        let json = r#"{"timestamp":"2024-01-02T00:00:00Z","symbol":"BTC","price":-100.0,"volume":1.0}"#;
        let err = serde_json::from_str::<MarketEvent>(json).unwrap_err();
        assert!(err.to_string().contains("price must be positive"));
    }

    #[test]
    fn invalid_signal_and_order_json_is_rejected() {
        let signal = r#"{"timestamp":"2024-01-02T00:00:00Z","symbol":"BTC","side":"buy","strength":2.0}"#;
        assert!(serde_json::from_str::<SignalEvent>(signal).is_err());

        let order = r#"{"timestamp":"2024-01-02T00:00:00Z","symbol":"BTC","side":"buy","quantity":-1.0,"order_type":{"type":"market"}}"#;
        assert!(serde_json::from_str::<OrderEvent>(order).is_err());
    }

    #[test]
    fn forged_fill_json_is_rejected() {
        let forged_total = r#"{"timestamp":"2024-01-02T00:00:00Z","symbol":"BTC","side":"buy","quantity":10.0,"executed_price":100.0,"commission":2.0,"slippage_amount":0.0,"total_cost":0.0}"#;
        let err = serde_json::from_str::<FillEvent>(forged_total).unwrap_err();
        assert!(err.to_string().contains("does not match"));

        let negative_fee = r#"{"timestamp":"2024-01-02T00:00:00Z","symbol":"BTC","side":"buy","quantity":10.0,"executed_price":100.0,"commission":-50.0,"slippage_amount":-1.0,"total_cost":950.0}"#;
        assert!(serde_json::from_str::<FillEvent>(negative_fee).is_err());
    }

    #[test]
    fn derived_fill_survives_json() {
        let buy = OrderEvent::market(ts(), "BTC", OrderSide::Buy, 2.001).unwrap();
        let fill = FillEvent::derive(&buy, 100.05, 0.400_2, 0.05);
        let json = serde_json::to_string(&Event::from(fill.clone())).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), EventKind::Fill);
        assert_eq!(back.symbol(), "BTC");
        let Event::Fill(back) = back else { unreachable!() };
        assert!((back.total_cost() - fill.total_cost()).abs() < 1e-9);
    }
}
