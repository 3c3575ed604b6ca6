//! Bybit public market-data client for spot tickers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::models::Quote;

use super::types::{ApiResponse, TickerEntry, TickerList};
use super::TickerSource;

const BYBIT_API_BASE: &str = "https://api.bybit.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for Bybit's v5 REST API (read-only operations).
pub struct BybitClient {
    client: Client,
    base_url: String,
}

impl BybitClient {
    /// Create a new client with default settings.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BYBIT_API_BASE.to_string())
    }

    /// Create with custom base URL (testnet or a local mock).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Fetch the spot ticker for a symbol such as `BTCUSDT`.
    pub async fn get_ticker(&self, symbol: &str) -> Result<TickerEntry> {
        let url = format!(
            "{}/v5/market/tickers?category=spot&symbol={}",
            self.base_url, symbol
        );

        debug!(url = %url, "Fetching ticker");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch ticker")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ticker request failed: {} - {}", status, body);
        }

        let body: ApiResponse<TickerList> = response
            .json()
            .await
            .context("Failed to parse ticker response")?;

        extract_ticker(body, symbol)
    }
}

/// Unwrap the v5 envelope down to the ticker for `symbol`.
fn extract_ticker(body: ApiResponse<TickerList>, symbol: &str) -> Result<TickerEntry> {
    if body.ret_code != 0 {
        anyhow::bail!("Bybit error {}: {}", body.ret_code, body.ret_msg);
    }

    body.result
        .and_then(|r| r.list.into_iter().find(|t| t.symbol.eq_ignore_ascii_case(symbol)))
        .with_context(|| format!("No ticker returned for {}", symbol))
}

#[async_trait]
impl TickerSource for BybitClient {
    async fn fetch_quote(&mut self, symbol: &str) -> Result<Quote> {
        let ticker = self.get_ticker(symbol).await?;
        Ok(Quote::new(ticker.bid_price, ticker.ask_price))
    }
}
