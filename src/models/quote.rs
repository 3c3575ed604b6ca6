//! Top-of-book quote for the traded symbol.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Best bid/ask snapshot taken from the exchange ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Best bid price in quote currency
    pub bid: Decimal,

    /// Best ask price in quote currency
    pub ask: Decimal,

    /// When the quote was observed
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self {
            bid,
            ask,
            observed_at: Utc::now(),
        }
    }

    /// Midpoint between bid and ask.
    pub fn mid(&self) -> Result<Decimal> {
        self.bid
            .checked_add(self.ask)
            .map(|sum| sum / dec!(2))
            .context("Mid price overflowed")
    }

    /// Absolute bid/ask spread.
    pub fn spread(&self) -> Result<Decimal> {
        self.ask
            .checked_sub(self.bid)
            .context("Spread overflowed")
    }

    /// Reject quotes the decision loop cannot act on.
    pub fn validate(&self) -> Result<()> {
        if self.bid <= Decimal::ZERO || self.ask <= Decimal::ZERO {
            anyhow::bail!(
                "Quote prices must be positive (bid {}, ask {})",
                self.bid,
                self.ask
            );
        }
        if self.ask < self.bid {
            anyhow::bail!("Crossed quote: ask {} below bid {}", self.ask, self.bid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_mid_and_spread() {
        let quote = Quote::new(dec!(99), dec!(101));
        assert_eq!(quote.mid().unwrap(), dec!(100));
        assert_eq!(quote.spread().unwrap(), dec!(2));
    }

    #[test]
    fn test_mid_reports_overflow() {
        let quote = Quote::new(Decimal::MAX, Decimal::MAX);
        assert_ok!(quote.validate());
        assert_err!(quote.mid());
    }

    #[test]
    fn test_validate() {
        assert_ok!(Quote::new(dec!(99), dec!(101)).validate());
        assert_ok!(Quote::new(dec!(100), dec!(100)).validate());
        assert_err!(Quote::new(dec!(0), dec!(101)).validate());
        assert_err!(Quote::new(dec!(-1), dec!(101)).validate());
        assert_err!(Quote::new(dec!(102), dec!(101)).validate());
    }

    #[test]
    fn test_deserialize_without_timestamp() {
        let quote: Quote = serde_json::from_str(r#"{"bid": "99.5", "ask": 100.5}"#).unwrap();
        assert_eq!(quote.bid, dec!(99.5));
        assert_eq!(quote.ask, dec!(100.5));
    }
}
