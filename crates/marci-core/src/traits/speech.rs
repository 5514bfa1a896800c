// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech adapter trait for text-to-speech output.

use async_trait::async_trait;

use crate::error::MarciError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for spoken output of finalized assistant replies.
#[async_trait]
pub trait SpeechAdapter: PluginAdapter {
    /// Speaks `text`. Cancels any utterance already in progress.
    async fn speak(&self, text: &str) -> Result<(), MarciError>;

    /// Stops any utterance in progress.
    async fn stop(&self) -> Result<(), MarciError>;
}
