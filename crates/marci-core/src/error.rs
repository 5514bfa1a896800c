// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Marci companion core.

use thiserror::Error;

/// The primary error type used across all Marci adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MarciError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-value store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Completion provider errors (API failure, rate limits, safety filters).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Speech output errors.
    #[error("speech error: {0}")]
    Speech(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
