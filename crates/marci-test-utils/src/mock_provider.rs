// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted responses,
//! enabling fast, CI-runnable tests without external API calls. Every
//! request is also recorded for assertion.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use tokio::sync::Mutex;

use marci_core::{
    AdapterType, ChatStreamRequest, ChunkStream, HealthStatus, MarciError, PluginAdapter,
    ProviderAdapter, StreamChunk, StructuredRequest, TextRequest,
};

/// One scripted element of a streaming response.
#[derive(Debug, Clone)]
pub enum ScriptItem {
    /// A text delta.
    Delta(String),
    /// A stream error with the given provider message.
    Error(String),
    /// A real suspension point of the given duration, so tests with a
    /// paused clock can act while the stream is in flight.
    Pause(u64),
}

#[derive(Debug, Clone)]
enum Outcome<T> {
    Ok(T),
    Err(String),
}

#[derive(Default)]
struct Queues {
    streams: VecDeque<Vec<ScriptItem>>,
    texts: VecDeque<Outcome<String>>,
    structured: VecDeque<Outcome<serde_json::Value>>,
}

#[derive(Default)]
struct Recorded {
    stream_requests: Vec<ChatStreamRequest>,
    text_requests: Vec<TextRequest>,
    structured_requests: Vec<StructuredRequest>,
}

/// A mock provider that replays scripted responses in FIFO order.
///
/// When a queue is empty, streaming falls back to a single "mock reply"
/// delta, text completion to "mock reply", and structured completion to an
/// empty JSON object.
pub struct MockProvider {
    queues: Arc<Mutex<Queues>>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            queues: Arc::new(Mutex::new(Queues::default())),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Queues a full streaming script.
    pub async fn push_stream_script(&self, script: Vec<ScriptItem>) {
        self.queues.lock().await.streams.push_back(script);
    }

    /// Queues a stream that yields `deltas` in order and then ends.
    pub async fn push_stream_deltas(&self, deltas: &[&str]) {
        let script = deltas
            .iter()
            .map(|d| ScriptItem::Delta(d.to_string()))
            .collect();
        self.push_stream_script(script).await;
    }

    /// Queues a stream that fails with `message` before yielding any delta.
    pub async fn push_stream_failure(&self, message: &str) {
        self.push_stream_script(vec![ScriptItem::Error(message.to_string())])
            .await;
    }

    /// Queues a stream that ends without yielding anything.
    pub async fn push_empty_stream(&self) {
        self.push_stream_script(Vec::new()).await;
    }

    /// Queues a one-shot text response.
    pub async fn push_text_response(&self, text: &str) {
        self.queues
            .lock()
            .await
            .texts
            .push_back(Outcome::Ok(text.to_string()));
    }

    /// Queues a one-shot text failure.
    pub async fn push_text_failure(&self, message: &str) {
        self.queues
            .lock()
            .await
            .texts
            .push_back(Outcome::Err(message.to_string()));
    }

    /// Queues a structured-JSON response.
    pub async fn push_structured_response(&self, value: serde_json::Value) {
        self.queues
            .lock()
            .await
            .structured
            .push_back(Outcome::Ok(value));
    }

    /// Queues a structured-JSON failure.
    pub async fn push_structured_failure(&self, message: &str) {
        self.queues
            .lock()
            .await
            .structured
            .push_back(Outcome::Err(message.to_string()));
    }

    /// Streaming requests received so far.
    pub async fn stream_requests(&self) -> Vec<ChatStreamRequest> {
        self.recorded.lock().await.stream_requests.clone()
    }

    /// Text requests received so far.
    pub async fn text_requests(&self) -> Vec<TextRequest> {
        self.recorded.lock().await.text_requests.clone()
    }

    /// Structured requests received so far.
    pub async fn structured_requests(&self) -> Vec<StructuredRequest> {
        self.recorded.lock().await.structured_requests.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn provider_error(message: String) -> MarciError {
    MarciError::Provider {
        message,
        source: None,
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MarciError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MarciError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete_text(&self, request: TextRequest) -> Result<String, MarciError> {
        self.recorded.lock().await.text_requests.push(request);
        match self.queues.lock().await.texts.pop_front() {
            Some(Outcome::Ok(text)) => Ok(text),
            Some(Outcome::Err(message)) => Err(provider_error(message)),
            None => Ok("mock reply".to_string()),
        }
    }

    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value, MarciError> {
        self.recorded.lock().await.structured_requests.push(request);
        match self.queues.lock().await.structured.pop_front() {
            Some(Outcome::Ok(value)) => Ok(value),
            Some(Outcome::Err(message)) => Err(provider_error(message)),
            None => Ok(serde_json::json!({})),
        }
    }

    async fn stream_chat(&self, request: ChatStreamRequest) -> Result<ChunkStream, MarciError> {
        self.recorded.lock().await.stream_requests.push(request);

        let script = self
            .queues
            .lock()
            .await
            .streams
            .pop_front()
            .unwrap_or_else(|| vec![ScriptItem::Delta("mock reply".to_string())]);

        let mapped = stream::iter(script)
            .then(|item| async move {
                match item {
                    ScriptItem::Delta(text) => Some(Ok(StreamChunk {
                        text: Some(text),
                        finish_reason: None,
                        usage: None,
                    })),
                    ScriptItem::Error(message) => Some(Err(provider_error(message))),
                    ScriptItem::Pause(ms) => {
                        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                        None
                    }
                }
            })
            .filter_map(|item| async move { item });

        Ok(Box::pin(mapped))
    }
}
