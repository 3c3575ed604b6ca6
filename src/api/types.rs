//! Response types for the Bybit v5 public market API.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Envelope shared by every v5 endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    pub result: Option<T>,
}

/// Payload of /v5/market/tickers.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerList {
    #[serde(default)]
    pub list: Vec<TickerEntry>,
}

/// One spot ticker; prices arrive as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerEntry {
    pub symbol: String,
    #[serde(rename = "bid1Price")]
    pub bid_price: Decimal,
    #[serde(rename = "ask1Price")]
    pub ask_price: Decimal,
    #[serde(default)]
    pub last_price: Option<Decimal>,
}
