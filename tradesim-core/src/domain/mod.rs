//! Domain types for TradeSim

pub mod event;
pub mod ledger;
pub mod prices;

pub use event::{
    Event, EventError, EventKind, FillEvent, MarketEvent, OrderEvent, OrderSide, OrderType,
    SignalEvent,
};
pub use ledger::{LedgerError, PortfolioLedger};
pub use prices::LastPriceTable;
