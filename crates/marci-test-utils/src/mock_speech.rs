// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock speech adapter that records spoken text.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use marci_core::{AdapterType, HealthStatus, MarciError, PluginAdapter, SpeechAdapter};

/// A speech adapter that records everything it is asked to speak.
#[derive(Default)]
pub struct MockSpeech {
    spoken: Arc<Mutex<Vec<String>>>,
    stopped: Arc<Mutex<u32>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// All texts spoken so far, in order.
    pub async fn spoken(&self) -> Vec<String> {
        self.spoken.lock().await.clone()
    }

    /// Number of times `stop` was called.
    pub async fn stop_count(&self) -> u32 {
        *self.stopped.lock().await
    }
}

#[async_trait]
impl PluginAdapter for MockSpeech {
    fn name(&self) -> &str {
        "mock-speech"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Speech
    }

    async fn health_check(&self) -> Result<HealthStatus, MarciError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MarciError> {
        Ok(())
    }
}

#[async_trait]
impl SpeechAdapter for MockSpeech {
    async fn speak(&self, text: &str) -> Result<(), MarciError> {
        self.spoken.lock().await.push(text.to_string());
        Ok(())
    }

    async fn stop(&self) -> Result<(), MarciError> {
        *self.stopped.lock().await += 1;
        Ok(())
    }
}
