// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Marci companion.
//!
//! Provides the [`SqliteKv`] key-value adapter and the [`SessionStore`],
//! which keeps the whole session map as one JSON blob under a fixed key.

pub mod database;
pub mod kv;
pub mod sessions;

pub use database::Database;
pub use kv::SqliteKv;
pub use sessions::{SessionStore, SESSIONS_KEY};
