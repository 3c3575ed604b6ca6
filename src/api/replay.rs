//! Recorded quotes played back in order.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::Quote;

use super::TickerSource;

/// Ticker source backed by a fixed list of quotes.
#[derive(Debug, Clone, Default)]
pub struct ReplayFeed {
    quotes: VecDeque<Quote>,
}

impl ReplayFeed {
    pub fn new(quotes: impl IntoIterator<Item = Quote>) -> Self {
        Self {
            quotes: quotes.into_iter().collect(),
        }
    }

    /// Load a JSON array of `{ "bid": .., "ask": .. }` objects.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let quotes: Vec<Quote> = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse replay file {}", path.display()))?;
        Ok(Self::new(quotes))
    }

    /// Quotes not yet played.
    pub fn remaining(&self) -> usize {
        self.quotes.len()
    }
}

#[async_trait]
impl TickerSource for ReplayFeed {
    async fn fetch_quote(&mut self, _symbol: &str) -> Result<Quote> {
        self.quotes.pop_front().context("Replay feed exhausted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_plays_in_order_then_fails() {
        let mut feed = ReplayFeed::new([
            Quote::new(dec!(99), dec!(101)),
            Quote::new(dec!(94), dec!(96)),
        ]);

        assert_eq!(feed.fetch_quote("BTCUSDT").await.unwrap().mid().unwrap(), dec!(100));
        assert_eq!(feed.fetch_quote("BTCUSDT").await.unwrap().mid().unwrap(), dec!(95));
        assert_eq!(feed.remaining(), 0);
        assert!(feed.fetch_quote("BTCUSDT").await.is_err());
    }

    #[tokio::test]
    async fn test_from_file() {
        let path = std::env::temp_dir().join(format!("ticks-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, r#"[{"bid": 99, "ask": 101}, {"bid": "94", "ask": "96"}]"#)
            .await
            .unwrap();

        let feed = ReplayFeed::from_file(&path).await.unwrap();
        assert_eq!(feed.remaining(), 2);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
