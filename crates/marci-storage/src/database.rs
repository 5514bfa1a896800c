// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use tokio_rusqlite::Connection;
use tracing::debug;

use marci_core::MarciError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// A single SQLite connection with the schema applied.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Opens (creating if necessary) the database at `path`, enables WAL
    /// mode, and applies the schema.
    pub async fn open(path: &str) -> Result<Self, MarciError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| MarciError::Storage {
                source: Box::new(e),
            })?;
        }

        // `open` surfaces the underlying rusqlite error directly.
        let connection = Connection::open(path)
            .await
            .map_err(|e| MarciError::Storage {
                source: Box::new(e),
            })?;
        connection
            .call(|conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { connection })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

/// Converts a tokio-rusqlite error into the shared storage error variant.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> MarciError {
    MarciError::Storage {
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        // kv table exists and is writable.
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)",
                    ["k", "v"],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
            .unwrap();
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/marci.db");
        Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
    }
}
