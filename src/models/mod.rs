//! Data models for quotes, positions, and completed trade cycles.

mod quote;
mod trade;

pub use quote::Quote;
pub use trade::{CompletedCycle, LastTrade, LegStatus, PositionState, TargetPair};
