//! SQLite balance store with completed-cycle history.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::models::CompletedCycle;

use super::{BalanceRecord, BalanceStore};

/// Database connection pool holding the balance and cycle history.
pub struct SqliteStore {
    pool: SqlitePool,
}

/// Stored balance row.
#[derive(Debug, Clone, sqlx::FromRow)]
struct StoredBalance {
    balance: String,
    last_updated: String,
}

/// Stored completed cycle.
#[derive(Debug, Clone, sqlx::FromRow)]
struct StoredCycle {
    id: String,
    buy_target: String,
    sell_target: String,
    entry_size: String,
    exit_size: String,
    profit: String,
    balance_after: String,
    completed_at: String,
}

impl StoredCycle {
    fn into_cycle(self) -> Result<CompletedCycle> {
        Ok(CompletedCycle {
            id: self.id,
            buy_target: parse_decimal(&self.buy_target)?,
            sell_target: parse_decimal(&self.sell_target)?,
            entry_size: parse_decimal(&self.entry_size)?,
            exit_size: parse_decimal(&self.exit_size)?,
            profit: parse_decimal(&self.profit)?,
            balance_after: parse_decimal(&self.balance_after)?,
            completed_at: parse_timestamp(&self.completed_at)?,
        })
    }
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Invalid stored decimal: {}", value))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp: {}", value))
}

impl SqliteStore {
    /// Open (or create) the database and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        // One connection: the loop is serial, and `sqlite::memory:` is per-connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS balance_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                balance TEXT NOT NULL,
                last_updated TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trade_cycles (
                id TEXT PRIMARY KEY,
                buy_target TEXT NOT NULL,
                sell_target TEXT NOT NULL,
                entry_size TEXT NOT NULL,
                exit_size TEXT NOT NULL,
                profit TEXT NOT NULL,
                balance_after TEXT NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trade_cycles_completed ON trade_cycles(completed_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BalanceStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self) -> Result<Option<BalanceRecord>> {
        let row = sqlx::query_as::<_, StoredBalance>(
            "SELECT balance, last_updated FROM balance_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load balance")?;

        row.map(|r| -> Result<BalanceRecord> {
            Ok(BalanceRecord {
                balance: parse_decimal(&r.balance)?,
                last_updated: parse_timestamp(&r.last_updated)?,
            })
        })
        .transpose()
    }

    async fn save(&self, balance: Decimal) -> Result<()> {
        let record = BalanceRecord::now(balance);

        sqlx::query(
            r#"
            INSERT INTO balance_state (id, balance, last_updated)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                balance = excluded.balance,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(record.balance.to_string())
        .bind(record.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save balance")?;

        Ok(())
    }

    async fn record_cycle(&self, cycle: &CompletedCycle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trade_cycles (
                id, buy_target, sell_target, entry_size, exit_size,
                profit, balance_after, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cycle.id)
        .bind(cycle.buy_target.to_string())
        .bind(cycle.sell_target.to_string())
        .bind(cycle.entry_size.to_string())
        .bind(cycle.exit_size.to_string())
        .bind(cycle.profit.to_string())
        .bind(cycle.balance_after.to_string())
        .bind(cycle.completed_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to record trade cycle")?;

        Ok(())
    }

    async fn recent_cycles(&self, limit: u32) -> Result<Vec<CompletedCycle>> {
        let rows = sqlx::query_as::<_, StoredCycle>(
            "SELECT * FROM trade_cycles ORDER BY completed_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch trade cycles")?;

        rows.into_iter().map(StoredCycle::into_cycle).collect()
    }
}
