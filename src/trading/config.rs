//! Trading configuration.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Parameters of the spread/profit heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Fixed profit target added to the buy target, in quote currency
    pub profit_target: Decimal,

    /// Fraction of the balance committed per trade (0.0 to 1.0)
    pub entry_fraction: Decimal,

    /// Exchange fee rate charged on each leg (0.0 to 1.0)
    pub fee_rate: Decimal,

    /// Entry size used when the balance is not positive
    pub fallback_trade_size: Decimal,

    /// Balance used when the store has no prior state
    pub starting_balance: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            profit_target: dec!(30),          // Fixed $30 target
            entry_fraction: dec!(0.2),        // 20% of balance
            fee_rate: dec!(0.0005),           // 0.05% taker fee
            fallback_trade_size: dec!(10),
            starting_balance: dec!(1000),
        }
    }
}

impl TradingConfig {
    /// Check parameter ranges before the loop starts.
    pub fn validate(&self) -> Result<()> {
        if self.profit_target <= Decimal::ZERO {
            anyhow::bail!("profit_target must be positive, got {}", self.profit_target);
        }
        if self.entry_fraction <= Decimal::ZERO || self.entry_fraction > Decimal::ONE {
            anyhow::bail!("entry_fraction must be in (0, 1], got {}", self.entry_fraction);
        }
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            anyhow::bail!("fee_rate must be in [0, 1), got {}", self.fee_rate);
        }
        if self.fallback_trade_size < Decimal::ZERO {
            anyhow::bail!(
                "fallback_trade_size must not be negative, got {}",
                self.fallback_trade_size
            );
        }
        if self.starting_balance < Decimal::ZERO {
            anyhow::bail!(
                "starting_balance must not be negative, got {}",
                self.starting_balance
            );
        }
        Ok(())
    }
}
