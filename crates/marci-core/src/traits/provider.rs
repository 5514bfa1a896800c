// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for AI completion backends.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::MarciError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatStreamRequest, StreamChunk, StructuredRequest, TextRequest};

/// A boxed stream of completion chunks, the item type of [`ProviderAdapter::stream_chat`].
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, MarciError>> + Send>>;

/// Adapter for AI completion backends.
///
/// Providers support one-shot free-text completions, one-shot structured-JSON
/// completions, and streaming multi-turn chat completions.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a one-shot prompt and returns the full text response.
    async fn complete_text(&self, request: TextRequest) -> Result<String, MarciError>;

    /// Sends a one-shot prompt with an output schema and returns the parsed
    /// JSON value. Implementations must tolerate markdown-fenced output.
    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value, MarciError>;

    /// Sends a multi-turn chat request and returns a stream of response chunks.
    async fn stream_chat(&self, request: ChatStreamRequest) -> Result<ChunkStream, MarciError>;
}
