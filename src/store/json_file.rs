//! File-backed balance store.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{BalanceRecord, BalanceStore};

/// Stores the balance as a pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BalanceStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn load(&self) -> Result<Option<BalanceRecord>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No balance file yet");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read balance file {}", self.path.display())
                })
            }
        };

        // A corrupt file is treated like a missing one
        match serde_json::from_str::<BalanceRecord>(&data) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Unreadable balance file, starting from default"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, balance: Decimal) -> Result<()> {
        let record = BalanceRecord::now(balance);
        let data = serde_json::to_string_pretty(&record).context("Failed to encode balance")?;

        tokio::fs::write(&self.path, data)
            .await
            .with_context(|| format!("Failed to write balance file {}", self.path.display()))?;

        debug!(path = %self.path.display(), balance = %balance, "Balance saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("spreadbot-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_loads_nothing() {
        let store = JsonFileStore::new(temp_path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = temp_path();
        let store = JsonFileStore::new(&path);

        store.save(dec!(1029.785)).await.unwrap();
        let record = store.load().await.unwrap().unwrap();
        assert_eq!(record.balance, dec!(1029.785));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_file_layout() {
        let path = temp_path();
        let store = JsonFileStore::new(&path);
        store.save(dec!(1000)).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["balance"].is_number());
        assert!(value["lastUpdated"].is_string());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_reads_legacy_record() {
        let path = temp_path();
        tokio::fs::write(
            &path,
            r#"{ "balance": 1059.57, "lastUpdated": "2024-11-02T10:15:30.000Z" }"#,
        )
        .await
        .unwrap();

        let record = JsonFileStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(record.balance, dec!(1059.57));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_nothing() {
        let path = temp_path();
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(JsonFileStore::new(&path).load().await.unwrap().is_none());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
