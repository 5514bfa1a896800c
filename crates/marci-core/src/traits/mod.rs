// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.

pub mod adapter;
pub mod provider;
pub mod speech;
pub mod storage;

pub use adapter::PluginAdapter;
pub use provider::{ChunkStream, ProviderAdapter};
pub use speech::SpeechAdapter;
pub use storage::KeyValueAdapter;
