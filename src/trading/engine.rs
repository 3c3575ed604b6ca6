//! Trade engine: runs the decision rules on each quote and persists the balance.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::models::{CompletedCycle, LastTrade, PositionState, Quote, TargetPair};
use crate::store::BalanceStore;

use super::decision::{Decision, TradeState};
use super::TradingConfig;

/// The most advanced transition taken during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    NoOp,
    TargetsSet,
    BoughtSimulated,
    SoldSimulated,
}

impl fmt::Display for TickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TickAction::NoOp => "no-op",
            TickAction::TargetsSet => "targets set",
            TickAction::BoughtSimulated => "bought (simulated)",
            TickAction::SoldSimulated => "sold (simulated)",
        };
        f.write_str(s)
    }
}

/// What a successful tick did and the state it left behind.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub action: TickAction,
    pub mid_price: Decimal,
    pub balance: Decimal,
    pub position: PositionState,
    pub targets: Option<TargetPair>,
    pub last_trade: LastTrade,

    /// Set when this tick completed a cycle
    pub cycle: Option<CompletedCycle>,
}

/// Outcome of one tick.
#[derive(Debug, Clone)]
pub enum TickResult {
    Completed(TickReport),

    /// No quote could be obtained or evaluated; state is unchanged
    Failed(String),
}

impl TickResult {
    pub fn action(&self) -> Option<TickAction> {
        match self {
            TickResult::Completed(report) => Some(report.action),
            TickResult::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TickResult::Failed(_))
    }
}

/// Owns the trading state and the store the balance is persisted to.
pub struct TradeEngine {
    config: TradingConfig,
    state: TradeState,
    store: Arc<dyn BalanceStore>,

    // Balance changed but the last save failed
    unsaved: bool,
}

impl TradeEngine {
    /// Create an engine, loading the starting balance from the store.
    pub async fn open(config: TradingConfig, store: Arc<dyn BalanceStore>) -> Result<Self> {
        config.validate()?;

        let balance = match store.load().await? {
            Some(record) if record.balance < Decimal::ZERO => {
                warn!(
                    store = store.name(),
                    balance = %record.balance,
                    starting_balance = %config.starting_balance,
                    "Restored balance is negative, starting with default"
                );
                config.starting_balance
            }
            Some(record) => {
                info!(
                    store = store.name(),
                    balance = %record.balance,
                    last_updated = %record.last_updated,
                    "Restored balance"
                );
                record.balance
            }
            None => {
                info!(
                    store = store.name(),
                    balance = %config.starting_balance,
                    "No previous balance found, starting with default"
                );
                config.starting_balance
            }
        };

        Ok(Self {
            config,
            state: TradeState::new(balance),
            store,
            unsaved: false,
        })
    }

    pub fn state(&self) -> &TradeState {
        &self.state
    }

    pub fn balance(&self) -> Decimal {
        self.state.balance
    }

    /// Whether the in-memory balance is ahead of the store.
    pub fn has_unsaved_balance(&self) -> bool {
        self.unsaved
    }

    /// Evaluate one quote.
    ///
    /// Invalid quotes, and quotes whose arithmetic would overflow, are reported
    /// as `TickResult::Failed` and leave the state untouched. A completed sell saves the balance before returning.
    pub async fn on_tick(&mut self, quote: &Quote) -> TickResult {
        if let Err(e) = quote.validate() {
            warn!(bid = %quote.bid, ask = %quote.ask, error = %e, "Rejected quote");
            return TickResult::Failed(e.to_string());
        }

        let mid = match quote.mid() {
            Ok(mid) => mid,
            Err(e) => return unevaluated(quote, e),
        };
        info!(mid = %mid.round_dp(2), "Current price");

        let entry_size = self.state.entry_size;
        let decisions = match self.state.apply(quote, &self.config) {
            Ok(decisions) => decisions,
            Err(e) => return unevaluated(quote, e),
        };

        let mut action = TickAction::NoOp;
        let mut cycle = None;

        for decision in decisions {
            match decision {
                Decision::TargetsSet(targets) => {
                    action = TickAction::TargetsSet;
                    info!(
                        buy = %targets.buy.round_dp(2),
                        sell = %targets.sell.round_dp(2),
                        "Waiting to buy"
                    );
                }
                Decision::Bought { entry_size } => {
                    action = TickAction::BoughtSimulated;
                    let targets = self.state.targets;
                    info!(
                        buy = ?targets.map(|t| t.buy.round_dp(2)),
                        sell = ?targets.map(|t| t.sell.round_dp(2)),
                        size = %entry_size.round_dp(2),
                        "Bought, waiting to sell"
                    );
                }
                Decision::Sold(breakdown) => {
                    action = TickAction::SoldSimulated;

                    // The sell clears the targets; the snapshot still holds them
                    let targets = TargetPair {
                        buy: self.state.last_trade.buy_price,
                        sell: self.state.last_trade.sell_price,
                    };
                    let completed = CompletedCycle {
                        id: uuid::Uuid::new_v4().to_string(),
                        buy_target: targets.buy,
                        sell_target: targets.sell,
                        entry_size: entry_size.unwrap_or(breakdown.trade_size),
                        exit_size: breakdown.trade_size,
                        profit: breakdown.profit,
                        balance_after: self.state.balance,
                        completed_at: Utc::now(),
                    };

                    self.persist(&completed).await;

                    info!("{}", self.state.last_trade);
                    info!(
                        sell = %targets.sell.round_dp(2),
                        profit = %breakdown.profit.round_dp(2),
                        balance = %self.state.balance.round_dp(2),
                        "Sold"
                    );
                    cycle = Some(completed);
                }
            }
        }

        TickResult::Completed(TickReport {
            action,
            mid_price: mid,
            balance: self.state.balance,
            position: self.state.position,
            targets: self.state.targets,
            last_trade: self.state.last_trade.clone(),
            cycle,
        })
    }

    /// Save the balance and record the cycle. Failures are logged, never raised.
    async fn persist(&mut self, cycle: &CompletedCycle) {
        match self.store.save(self.state.balance).await {
            Ok(()) => {
                self.unsaved = false;
                info!(balance = %self.state.balance.round_dp(2), "Balance saved");
            }
            Err(e) => {
                self.unsaved = true;
                error!(error = %e, "Failed to save balance, will retry on next sell");
            }
        }

        if let Err(e) = self.store.record_cycle(cycle).await {
            warn!(cycle = %cycle.id, error = %e, "Failed to record trade cycle");
        }
    }

    /// Save the balance if an earlier save failed.
    pub async fn flush(&mut self) -> Result<()> {
        if self.unsaved {
            self.store.save(self.state.balance).await?;
            self.unsaved = false;
            info!(balance = %self.state.balance.round_dp(2), "Unsaved balance flushed");
        }
        Ok(())
    }
}

/// A quote that passed validation but whose arithmetic overflowed.
fn unevaluated(quote: &Quote, e: anyhow::Error) -> TickResult {
    warn!(bid = %quote.bid, ask = %quote.ask, error = %e, "Quote could not be evaluated");
    TickResult::Failed(e.to_string())
}
