//! Trading logic: configuration, decision rules, and the tick engine.

mod config;
mod decision;
mod engine;

pub use config::TradingConfig;
pub use engine::{TickAction, TickResult, TradeEngine};
