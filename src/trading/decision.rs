//! Spread/profit decision rules for the single-position loop.
//!
//! The cycle is `FLAT (no targets) -> FLAT (targets set) -> LONG -> FLAT`:
//! - Targets are derived from the first quote seen while flat
//! - A buy fires once the mid price falls to the buy target
//! - A sell fires once the mid price reaches the sell target, realizing
//!   the fixed profit target minus fees on both legs

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{LastTrade, LegStatus, PositionState, Quote, TargetPair};

use super::TradingConfig;

/// Fee-adjusted P&L of one round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SellBreakdown {
    pub trade_size: Decimal,
    pub sell_return: Decimal,
    pub sell_fee: Decimal,
    pub final_return: Decimal,
    pub buy_cost: Decimal,
    pub profit: Decimal,
}

/// Compute the realized P&L for a round trip of `trade_size`.
///
/// The buy fee is folded into the cost basis here rather than charged when
/// the buy executes. Fails instead of overflowing.
pub fn profit_for(trade_size: Decimal, config: &TradingConfig) -> Result<SellBreakdown> {
    let sell_return = trade_size
        .checked_add(config.profit_target)
        .context("Sell return overflowed")?;
    let sell_fee = sell_return
        .checked_mul(config.fee_rate)
        .context("Sell fee overflowed")?;
    let final_return = sell_return
        .checked_sub(sell_fee)
        .context("Final return overflowed")?;
    let buy_cost = trade_size
        .checked_mul(config.fee_rate)
        .and_then(|fee| trade_size.checked_add(fee))
        .context("Buy cost overflowed")?;
    let profit = final_return
        .checked_sub(buy_cost)
        .context("Profit overflowed")?;

    Ok(SellBreakdown {
        trade_size,
        sell_return,
        sell_fee,
        final_return,
        buy_cost,
        profit,
    })
}

/// One state transition taken while evaluating a quote.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A new target pair was derived from the quote
    TargetsSet(TargetPair),

    /// The simulated buy executed
    Bought { entry_size: Decimal },

    /// The simulated sell executed and profit was applied to the balance
    Sold(SellBreakdown),
}

/// All mutable state of the decision loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeState {
    pub position: PositionState,

    /// Current target pair; `None` until derived for the next cycle
    pub targets: Option<TargetPair>,

    pub balance: Decimal,

    pub last_trade: LastTrade,

    /// Size computed when the open position was bought
    pub entry_size: Option<Decimal>,
}

impl TradeState {
    /// Flat state with no targets.
    pub fn new(balance: Decimal) -> Self {
        Self {
            position: PositionState::Flat,
            targets: None,
            balance,
            last_trade: LastTrade {
                balance,
                ..Default::default()
            },
            entry_size: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position == PositionState::Flat
    }

    /// Evaluate one validated quote, returning the transitions taken in order.
    ///
    /// An empty result means the quote crossed no threshold. On error the
    /// state is left exactly as it was.
    pub fn apply(&mut self, quote: &Quote, config: &TradingConfig) -> Result<Vec<Decision>> {
        let mut next = self.clone();
        let decisions = next.step(quote, config)?;
        *self = next;
        Ok(decisions)
    }

    fn step(&mut self, quote: &Quote, config: &TradingConfig) -> Result<Vec<Decision>> {
        let mid = quote.mid()?;
        let mut decisions = Vec::new();

        if self.is_flat() && self.targets.is_none() {
            let buy = quote
                .spread()?
                .checked_mul(dec!(2))
                .and_then(|offset| mid.checked_sub(offset))
                .context("Buy target overflowed")?;
            let sell = buy
                .checked_add(config.profit_target)
                .context("Sell target overflowed")?;
            let targets = TargetPair { buy, sell };
            self.targets = Some(targets);
            self.last_trade = LastTrade::pending(targets, self.balance);
            decisions.push(Decision::TargetsSet(targets));
        }

        let Some(targets) = self.targets else {
            return Ok(decisions);
        };

        if self.is_flat() && mid <= targets.buy {
            let entry_size = if self.balance > Decimal::ZERO {
                self.balance
                    .checked_mul(config.entry_fraction)
                    .context("Entry size overflowed")?
            } else {
                config.fallback_trade_size
            };
            self.position = PositionState::Long;
            self.entry_size = Some(entry_size);
            self.last_trade.buy_status = LegStatus::Executed;
            decisions.push(Decision::Bought { entry_size });
        }

        if self.position == PositionState::Long && mid >= targets.sell {
            // Sized off the current balance, not the size recorded at entry
            let trade_size = self
                .balance
                .checked_mul(config.entry_fraction)
                .context("Trade size overflowed")?;
            let breakdown = profit_for(trade_size, config)?;
            self.balance = self
                .balance
                .checked_add(breakdown.profit)
                .context("Balance overflowed")?;
            self.last_trade.sell_status = LegStatus::Executed;
            self.last_trade.profit = breakdown.profit;
            self.last_trade.balance = self.balance;

            self.position = PositionState::Flat;
            self.targets = None;
            self.entry_size = None;
            decisions.push(Decision::Sold(breakdown));
        }

        Ok(decisions)
    }
}
