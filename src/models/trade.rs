//! Position, target and trade-record types for the single-position loop.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a simulated buy is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

/// Status of one leg of a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LegStatus {
    #[default]
    Pending,
    Executed,
}

impl LegStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegStatus::Pending => "Pending",
            LegStatus::Executed => "Executed",
        }
    }
}

impl fmt::Display for LegStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry and exit prices for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPair {
    /// Mid price at or below which we buy
    pub buy: Decimal,

    /// Mid price at or above which we sell
    pub sell: Decimal,
}

/// Snapshot of the most recent cycle, kept for logging.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LastTrade {
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub buy_status: LegStatus,
    pub sell_status: LegStatus,
    pub profit: Decimal,

    /// Running balance after the last update
    pub balance: Decimal,
}

impl LastTrade {
    /// Fresh snapshot for a newly set target pair.
    pub fn pending(targets: TargetPair, balance: Decimal) -> Self {
        Self {
            buy_price: targets.buy,
            sell_price: targets.sell,
            buy_status: LegStatus::Pending,
            sell_status: LegStatus::Pending,
            profit: Decimal::ZERO,
            balance,
        }
    }
}

impl fmt::Display for LastTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Trade Log ===")?;
        writeln!(f, "Time:          {}", Local::now().format("%H:%M:%S"))?;
        writeln!(f, "Buy Price:     {:.2}", self.buy_price)?;
        writeln!(f, "Sell Price:    {:.2}", self.sell_price)?;
        writeln!(f, "Buy Status:    {}", self.buy_status)?;
        writeln!(f, "Sell Status:   {}", self.sell_status)?;
        writeln!(f, "Profit:        {:.2}", self.profit)?;
        writeln!(f, "Total Balance: {:.2}", self.balance)?;
        write!(f, "=================")
    }
}

/// A finished buy-then-sell round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedCycle {
    /// Unique cycle identifier
    pub id: String,

    pub buy_target: Decimal,
    pub sell_target: Decimal,

    /// Size computed when the buy executed
    pub entry_size: Decimal,

    /// Size used for the sell-side P&L (recomputed from the balance at sell time)
    pub exit_size: Decimal,

    /// Realized profit after fees
    pub profit: Decimal,

    /// Balance once the profit was applied
    pub balance_after: Decimal,

    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pending_snapshot() {
        let targets = TargetPair {
            buy: dec!(96),
            sell: dec!(126),
        };
        let snapshot = LastTrade::pending(targets, dec!(1000));

        assert_eq!(snapshot.buy_price, dec!(96));
        assert_eq!(snapshot.sell_price, dec!(126));
        assert_eq!(snapshot.buy_status, LegStatus::Pending);
        assert_eq!(snapshot.sell_status, LegStatus::Pending);
        assert_eq!(snapshot.profit, Decimal::ZERO);
    }

    #[test]
    fn test_trade_log_block() {
        let snapshot = LastTrade {
            buy_price: dec!(96),
            sell_price: dec!(126),
            buy_status: LegStatus::Executed,
            sell_status: LegStatus::Executed,
            profit: dec!(29.785),
            balance: dec!(1029.785),
        };
        let block = snapshot.to_string();

        assert!(block.contains("=== Trade Log ==="));
        assert!(block.contains("Buy Price:     96"));
        assert!(block.contains("Sell Status:   Executed"));
        assert!(block.contains("Total Balance: 1029.7"));
    }
}
