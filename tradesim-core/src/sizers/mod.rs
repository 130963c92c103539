//! Position Sizers — determine order quantity
//!
//! Sizers translate a signal and the cash on hand into a unit quantity.
//! They never decide direction (that's the strategy's job) and never
//! choose order types.

pub mod allocation;

pub use allocation::AllocationSizer;

use crate::domain::SignalEvent;

/// Position sizing logic
///
/// # Arguments
/// - `cash`: Cash currently available in the ledger
/// - `signal`: The signal being converted (strength is advisory)
/// - `price`: Last known price of the signal's symbol (> 0)
///
/// # Returns
/// Quantity to order. The engine drops the signal if this is not a
/// positive, finite number.
pub trait Sizer {
    fn size(&self, cash: f64, signal: &SignalEvent, price: f64) -> f64;

    /// Sizer name for logging
    fn name(&self) -> &str;
}
