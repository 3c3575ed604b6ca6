//! Ticker sources feeding quotes to the decision loop.

mod bybit_client;
mod replay;
mod types;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Quote;

pub use bybit_client::BybitClient;
pub use replay::ReplayFeed;

/// Anything that can produce the current best bid/ask for a symbol.
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote>;
}
