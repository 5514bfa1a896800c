// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the persistent key-value store.

use async_trait::async_trait;

use crate::error::MarciError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for flat key-value persistence.
///
/// The store holds opaque string values under string keys. Writes replace
/// the whole value for a key; there are no partial updates.
#[async_trait]
pub trait KeyValueAdapter: PluginAdapter {
    /// Initializes the store (creates the backing file and schema if absent).
    async fn initialize(&self) -> Result<(), MarciError>;

    /// Returns the value for `key`, or `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, MarciError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<(), MarciError>;

    /// Removes `key` if present. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), MarciError>;

    /// Flushes and closes the store.
    async fn close(&self) -> Result<(), MarciError>;
}
