// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech adapter for terminal deployments.
//!
//! There is no TTS device behind a terminal, so this adapter records the
//! request in the log and nothing more. The engine still goes through the
//! full speak path, so swapping in a real backend is a wiring change only.

use async_trait::async_trait;

use marci_core::{AdapterType, HealthStatus, MarciError, PluginAdapter, SpeechAdapter};
use tracing::debug;

#[derive(Default)]
pub struct ConsoleSpeech;

impl ConsoleSpeech {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluginAdapter for ConsoleSpeech {
    fn name(&self) -> &str {
        "console-speech"
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
impl SpeechAdapter for ConsoleSpeech {
    async fn speak(&self, text: &str) -> Result<(), MarciError> {
        debug!(chars = text.len(), "speech requested");
        Ok(())
    }

    async fn stop(&self) -> Result<(), MarciError> {
        debug!("speech stop requested");
        Ok(())
    }
}
