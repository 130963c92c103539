//! Example strategies

pub mod buy_and_hold;
pub mod ma_cross;
pub mod random;

pub use buy_and_hold::{BuyAndHold, HoldStrategy};
pub use ma_cross::MovingAverageCross;
pub use random::RandomStrategy;
