// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters for deterministic testing of the Marci companion.

pub mod memory_kv;
pub mod mock_provider;
pub mod mock_speech;

pub use memory_kv::MemoryKv;
pub use mock_provider::{MockProvider, ScriptItem};
pub use mock_speech::MockSpeech;
