//! Bot runner: fixed-interval scheduler around the trade engine.
//!
//! Handles:
//! - Polling the ticker source on a fixed period
//! - Serializing ticks so a slow fetch never overlaps the next one
//! - Turning fetch failures into `TickResult::Failed`
//! - Flushing an unsaved balance on shutdown

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use rust_decimal::Decimal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::TickerSource;
use crate::trading::{TickAction, TickResult, TradeEngine, TradingConfig};

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Exchange symbol, e.g. `BTCUSDT`
    pub symbol: String,

    /// Period between ticks (milliseconds)
    pub poll_interval_ms: u64,

    /// Trading configuration
    pub trading_config: TradingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            poll_interval_ms: 3000,
            trading_config: TradingConfig::default(),
        }
    }
}

/// Counters for the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub targets_set: u64,
    pub buys: u64,
    pub sells: u64,
    pub starting_balance: Decimal,
    pub balance: Decimal,
    pub realized_pnl: Decimal,
}

impl SessionStats {
    fn record(&mut self, result: &TickResult) {
        self.ticks += 1;
        match result {
            TickResult::Failed(_) => self.failed_ticks += 1,
            TickResult::Completed(report) => {
                match report.action {
                    TickAction::NoOp => {}
                    TickAction::TargetsSet => self.targets_set += 1,
                    // A zero-spread quote sets targets and buys in one tick
                    TickAction::BoughtSimulated => self.buys += 1,
                    TickAction::SoldSimulated => self.sells += 1,
                }
                if let Some(cycle) = &report.cycle {
                    self.realized_pnl += cycle.profit;
                }
                self.balance = report.balance;
            }
        }
    }

    /// Return on the starting balance for this session.
    pub fn return_pct(&self) -> Decimal {
        if self.starting_balance.is_zero() {
            return Decimal::ZERO;
        }
        (self.balance - self.starting_balance) / self.starting_balance
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(f, "Ticks:            {} ({} failed)", self.ticks, self.failed_ticks)?;
        writeln!(f, "Targets set:      {}", self.targets_set)?;
        writeln!(f, "Buys:             {}", self.buys)?;
        writeln!(f, "Completed cycles: {}", self.sells)?;
        writeln!(f, "Realized P&L:     {:.2}", self.realized_pnl)?;
        writeln!(f, "Starting balance: {:.2}", self.starting_balance)?;
        writeln!(f, "Balance:          {:.2}", self.balance)?;
        write!(f, "Return:           {:.2}%", self.return_pct() * Decimal::ONE_HUNDRED)
    }
}

/// Main bot runner.
pub struct Bot {
    config: BotConfig,
    engine: TradeEngine,
    source: Box<dyn TickerSource>,
    stats: SessionStats,

    // Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl Bot {
    pub fn new(config: BotConfig, engine: TradeEngine, source: Box<dyn TickerSource>) -> Self {
        let stats = SessionStats {
            starting_balance: engine.balance(),
            balance: engine.balance(),
            ..Default::default()
        };

        Self {
            config,
            engine,
            source,
            stats,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get shutdown signal for external control.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn engine(&self) -> &TradeEngine {
        &self.engine
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Main run loop. Returns after Ctrl+C or the shutdown signal.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            symbol = %self.config.symbol,
            poll_interval_ms = self.config.poll_interval_ms,
            balance = %self.engine.balance(),
            "Starting trading loop"
        );

        let period = Duration::from_millis(self.config.poll_interval_ms);
        let mut poll_interval = interval(period);
        // Ticks missed while one is in flight are dropped, not replayed in a burst
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        });

        while !self.shutdown.load(Ordering::SeqCst) {
            tokio::select! {
                _ = poll_interval.tick() => {}
                _ = tokio::time::sleep(Duration::from_millis(100)) => continue,
            }

            let started = Instant::now();
            self.tick().await;

            let elapsed = started.elapsed();
            if elapsed > period {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    period_ms = self.config.poll_interval_ms,
                    "Tick overran the polling interval, skipping missed ticks"
                );
            }
        }

        self.shutdown().await
    }

    /// Single iteration: fetch a quote and hand it to the engine.
    ///
    /// Takes `&mut self`, so two ticks can never run at once.
    pub async fn tick(&mut self) -> TickResult {
        debug!("Bot tick");

        let result = match self.source.fetch_quote(&self.config.symbol).await {
            Ok(quote) => self.engine.on_tick(&quote).await,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Error fetching ticker");
                TickResult::Failed(format!("{:#}", e))
            }
        };

        self.stats.record(&result);
        result
    }

    /// Graceful shutdown: persist anything the loop could not save.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down bot...");

        if let Err(e) = self.engine.flush().await {
            error!(error = %e, "Failed to flush balance on shutdown");
        }

        info!(balance = %self.engine.balance().round_dp(2), "Bot stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ReplayFeed;
    use crate::models::{PositionState, Quote};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;

    /// Source that replays scripted quotes and failures.
    struct ScriptedSource {
        steps: VecDeque<Result<Quote, String>>,
    }

    #[async_trait]
    impl TickerSource for ScriptedSource {
        async fn fetch_quote(&mut self, _symbol: &str) -> Result<Quote> {
            match self.steps.pop_front() {
                Some(Ok(quote)) => Ok(quote),
                Some(Err(msg)) => anyhow::bail!(msg),
                None => anyhow::bail!("script exhausted"),
            }
        }
    }

    fn quote_at(mid: Decimal) -> Quote {
        Quote::new(mid - dec!(1), mid + dec!(1))
    }

    async fn make_bot(source: Box<dyn TickerSource>, store: Arc<MemoryStore>) -> Bot {
        let config = BotConfig::default();
        let engine = TradeEngine::open(config.trading_config.clone(), store)
            .await
            .unwrap();
        Bot::new(config, engine, source)
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_state_unchanged() {
        let source = ScriptedSource {
            steps: VecDeque::from([
                Ok(Quote::new(dec!(99), dec!(101))),
                Err("exchange unavailable".to_string()),
            ]),
        };
        let mut bot = make_bot(Box::new(source), Arc::new(MemoryStore::new())).await;

        bot.tick().await;
        let before = bot.engine().state().clone();

        let result = bot.tick().await;
        let TickResult::Failed(reason) = result else {
            panic!("expected failure");
        };
        assert!(reason.contains("exchange unavailable"));
        assert_eq!(bot.engine().state(), &before);
        assert_eq!(bot.stats().failed_ticks, 1);
    }

    #[tokio::test]
    async fn test_replayed_cycle_persists_once() {
        // spread 2 around 100 -> buy 96, sell 126
        let feed = ReplayFeed::new([
            quote_at(dec!(100)),
            quote_at(dec!(110)),
            quote_at(dec!(95)),
            quote_at(dec!(120)),
            quote_at(dec!(130)),
            quote_at(dec!(131)),
        ]);
        let store = Arc::new(MemoryStore::new());
        let mut bot = make_bot(Box::new(feed), store.clone()).await;

        let mut actions = Vec::new();
        for _ in 0..6 {
            actions.push(bot.tick().await.action());
        }

        assert_eq!(
            actions,
            vec![
                Some(TickAction::TargetsSet),
                Some(TickAction::NoOp),
                Some(TickAction::BoughtSimulated),
                Some(TickAction::NoOp),
                Some(TickAction::SoldSimulated),
                Some(TickAction::TargetsSet),
            ]
        );
        assert_eq!(store.saved_balances(), vec![dec!(1029.785)]);
        assert_eq!(bot.engine().state().position, PositionState::Flat);

        let stats = bot.stats();
        assert_eq!(stats.sells, 1);
        assert_eq!(stats.realized_pnl, dec!(29.785));
        assert_eq!(stats.balance, dec!(1029.785));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let feed = ReplayFeed::new([quote_at(dec!(100))]);
        let mut bot = make_bot(Box::new(feed), Arc::new(MemoryStore::new())).await;

        bot.shutdown_signal().store(true, Ordering::SeqCst);
        bot.run().await.unwrap();
        assert_eq!(bot.stats().ticks, 0);
    }

    #[test]
    fn test_session_return() {
        let stats = SessionStats {
            starting_balance: dec!(1000),
            balance: dec!(1029.785),
            ..Default::default()
        };
        assert_eq!(stats.return_pct(), dec!(0.029785));
    }
}
