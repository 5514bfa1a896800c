// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Marci companion.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Marci workspace. All adapter plugins
//! implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MarciError;
pub use types::{
    now_millis, AdapterType, ChatMessage, ChatSession, ChatStreamRequest, ChatTurn, HealthStatus,
    Mood, PromptPart, Sender, SessionKind, SessionPatch, StreamChunk, StructuredRequest,
    TextRequest, TokenUsage, GENERAL_CATEGORY, NEW_CHAT_TITLE, SOCIAL_CATEGORY,
};

// Re-export all adapter traits at crate root.
pub use traits::{ChunkStream, KeyValueAdapter, PluginAdapter, ProviderAdapter, SpeechAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marci_error_has_all_variants() {
        let _config = MarciError::Config("test".into());
        let _storage = MarciError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = MarciError::Provider {
            message: "test".into(),
            source: None,
        };
        let _speech = MarciError::Speech("test".into());
        let _internal = MarciError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Provider,
            AdapterType::Storage,
            AdapterType::Speech,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("slow".into());
        let unhealthy = HealthStatus::Unhealthy("down".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, healthy);
        assert_ne!(unhealthy, healthy);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // If any trait module is missing or fails to compile, this test
        // won't compile.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_key_value_adapter<T: KeyValueAdapter>() {}
        fn _assert_speech_adapter<T: SpeechAdapter>() {}
    }
}
