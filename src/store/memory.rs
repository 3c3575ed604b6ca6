//! Process-local balance store.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::CompletedCycle;

use super::{BalanceRecord, BalanceStore};

/// Keeps the balance and every save in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<BalanceRecord>>,
    saves: Mutex<Vec<Decimal>>,
    cycles: Mutex<Vec<CompletedCycle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a balance, as if saved by an earlier run.
    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            record: Mutex::new(Some(BalanceRecord::now(balance))),
            ..Default::default()
        }
    }

    /// Every balance passed to `save`, oldest first.
    pub fn saved_balances(&self) -> Vec<Decimal> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Every cycle passed to `record_cycle`, oldest first.
    pub fn cycles(&self) -> Vec<CompletedCycle> {
        self.cycles.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<BalanceRecord>> {
        let record = self
            .record
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(record.clone())
    }

    async fn save(&self, balance: Decimal) -> Result<()> {
        *self
            .record
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))? = Some(BalanceRecord::now(balance));
        self.saves
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?
            .push(balance);
        Ok(())
    }

    async fn record_cycle(&self, cycle: &CompletedCycle) -> Result<()> {
        self.cycles
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?
            .push(cycle.clone());
        Ok(())
    }

    async fn recent_cycles(&self, limit: u32) -> Result<Vec<CompletedCycle>> {
        let cycles = self
            .cycles
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(cycles.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::with_balance(dec!(1000));
        store.save(dec!(1029.785)).await.unwrap();

        let record = store.load().await.unwrap().unwrap();
        assert_eq!(record.balance, dec!(1029.785));
        assert_eq!(store.saved_balances(), vec![dec!(1029.785)]);
    }

    #[tokio::test]
    async fn test_recent_cycles_respects_limit() {
        let store = MemoryStore::new();
        for profit in [dec!(1), dec!(2), dec!(3)] {
            let cycle = CompletedCycle {
                id: uuid::Uuid::new_v4().to_string(),
                buy_target: dec!(96),
                sell_target: dec!(126),
                entry_size: dec!(200),
                exit_size: dec!(200),
                profit,
                balance_after: dec!(1000) + profit,
                completed_at: chrono::Utc::now(),
            };
            assert_ok!(store.record_cycle(&cycle).await);
        }

        let recent = assert_ok!(store.recent_cycles(2).await);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].profit, dec!(3));
        assert!(assert_ok!(store.recent_cycles(0).await).is_empty());
    }
}
