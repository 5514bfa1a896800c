// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the KeyValueAdapter trait.

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio::sync::OnceCell;
use tracing::debug;

use marci_config::model::StorageConfig;
use marci_core::{AdapterType, HealthStatus, KeyValueAdapter, MarciError, PluginAdapter};

use crate::database::{map_tr_err, Database};

/// SQLite-backed key-value adapter.
///
/// Wraps a [`Database`] handle. The database is lazily opened on the first
/// call to [`KeyValueAdapter::initialize`].
pub struct SqliteKv {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteKv {
    /// Create a new SqliteKv with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, MarciError> {
        self.db.get().ok_or_else(|| MarciError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteKv {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MarciError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MarciError> {
        // Shutdown delegates to close if the DB was initialized.
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueAdapter for SqliteKv {
    async fn initialize(&self) -> Result<(), MarciError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| MarciError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite key-value store initialized");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, MarciError> {
        let key = key.to_string();
        self.db()?
            .connection()
            .call(move |conn| {
                let value = conn
                    .query_row("SELECT value FROM kv WHERE key = ?1", [&key], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), MarciError> {
        let key = key.to_string();
        let value = value.to_string();
        self.db()?
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    [&key, &value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove(&self, key: &str) -> Result<(), MarciError> {
        let key = key.to_string();
        self.db()?
            .connection()
            .call(move |conn| {
                conn.execute("DELETE FROM kv WHERE key = ?1", [&key])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn close(&self) -> Result<(), MarciError> {
        let db = self.db()?;
        // Checkpoint WAL before close.
        db.connection()
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
