// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory key-value adapter for tests that do not need a database file.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use marci_core::{AdapterType, HealthStatus, KeyValueAdapter, MarciError, PluginAdapter};

/// A `KeyValueAdapter` backed by a shared in-memory map.
#[derive(Default)]
pub struct MemoryKv {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a value, bypassing the adapter interface.
    pub async fn seed(&self, key: &str, value: &str) {
        self.map
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
    }

    /// Reads a value directly for assertions.
    pub async fn raw_get(&self, key: &str) -> Option<String> {
        self.map.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl PluginAdapter for MemoryKv {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MarciError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MarciError> {
        Ok(())
    }
}

#[async_trait]
impl KeyValueAdapter for MemoryKv {
    async fn initialize(&self) -> Result<(), MarciError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, MarciError> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), MarciError> {
        self.map
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), MarciError> {
        self.map.lock().await.remove(key);
        Ok(())
    }

    async fn close(&self) -> Result<(), MarciError> {
        Ok(())
    }
}
