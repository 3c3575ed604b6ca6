//! Balance persistence.
//!
//! The decision loop owns the balance; a store only keeps the latest value
//! so it survives restarts. Backends:
//! - `JsonFileStore`: a single `{ balance, lastUpdated }` JSON document
//! - `SqliteStore`: balance row plus a history of completed cycles
//! - `MemoryStore`: process-local, used for replays and tests

mod json_file;
mod memory;
mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::CompletedCycle;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persisted balance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRecord {
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,

    pub last_updated: DateTime<Utc>,
}

impl BalanceRecord {
    pub fn now(balance: Decimal) -> Self {
        Self {
            balance,
            last_updated: Utc::now(),
        }
    }
}

/// Durable home for the running balance.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Latest saved record, or `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<BalanceRecord>>;

    /// Replace the saved balance. Last write wins.
    async fn save(&self, balance: Decimal) -> Result<()>;

    /// Append a completed cycle to the history, if the backend keeps one.
    async fn record_cycle(&self, _cycle: &CompletedCycle) -> Result<()> {
        Ok(())
    }

    /// Most recent completed cycles, newest first.
    async fn recent_cycles(&self, _limit: u32) -> Result<Vec<CompletedCycle>> {
        Ok(Vec::new())
    }
}
