// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Theme suggestion advisor.
//!
//! Consumes successful prompts and occasionally proposes a color theme that
//! fits the user's mood. At most one suggestion per cooldown window; the
//! currently-active theme is never suggested; failures are swallowed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use marci_core::{ProviderAdapter, StructuredRequest};

/// A theme proposal with a short user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeSuggestion {
    pub theme_name: String,
    pub reason: String,
}

pub struct ThemeAdvisor {
    provider: Arc<dyn ProviderAdapter>,
    themes: Vec<String>,
    cooldown: Duration,
    last: Mutex<Option<Instant>>,
}

impl ThemeAdvisor {
    pub fn new(provider: Arc<dyn ProviderAdapter>, themes: Vec<String>, cooldown: Duration) -> Self {
        Self {
            provider,
            themes,
            cooldown,
            last: Mutex::new(None),
        }
    }

    /// Maybe suggests a theme for the given activity context.
    ///
    /// Returns `None` when the cooldown is active, no candidate theme
    /// exists, the provider fails, or the model picks an unknown or the
    /// current theme.
    pub async fn suggest(&self, context: &str, current_theme: &str) -> Option<ThemeSuggestion> {
        let candidates: Vec<&String> =
            self.themes.iter().filter(|t| *t != current_theme).collect();
        if candidates.is_empty() {
            return None;
        }

        {
            let mut last = self.last.lock().await;
            if let Some(at) = *last
                && at.elapsed() < self.cooldown
            {
                return None;
            }
            // Claim the window before the provider call so concurrent
            // successes cannot double-suggest.
            *last = Some(Instant::now());
        }

        let names: Vec<&str> = candidates.iter().map(|t| t.as_str()).collect();
        let prompt = format!(
            "Based on the user's recent activity (\"{context}\"), suggest a color theme that fits the mood.\nAvailable themes: {}.\nProvide a very short, friendly reason for the suggestion.",
            names.join(", ")
        );
        let schema = serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "themeName": { "type": "STRING" },
                "reason": { "type": "STRING" }
            }
        });

        let value = match self
            .provider
            .complete_structured(StructuredRequest {
                prompt,
                schema,
                fast: true,
            })
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "theme suggestion failed");
                return None;
            }
        };

        let theme_name = value.get("themeName")?.as_str()?.to_string();
        let reason = value.get("reason")?.as_str()?.to_string();
        if !self.themes.contains(&theme_name) || theme_name == current_theme {
            debug!(theme_name, "model picked an unavailable theme, dropping");
            return None;
        }
        Some(ThemeSuggestion { theme_name, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marci_test_utils::MockProvider;

    fn advisor(provider: Arc<MockProvider>, cooldown_secs: u64) -> ThemeAdvisor {
        ThemeAdvisor::new(
            provider,
            vec!["Aurora".into(), "Sunset".into(), "Midnight".into()],
            Duration::from_secs(cooldown_secs),
        )
    }

    #[tokio::test]
    async fn suggests_a_known_theme() {
        let provider = Arc::new(MockProvider::new());
        provider
            .push_structured_response(serde_json::json!({
                "themeName": "Sunset",
                "reason": "A warm vibe for your evening chat!"
            }))
            .await;

        let advisor = advisor(provider.clone(), 3600);
        let suggestion = advisor.suggest("planning a beach trip", "Aurora").await;
        assert_eq!(suggestion.unwrap().theme_name, "Sunset");

        // Current theme was excluded from the offered list.
        let requests = provider.structured_requests().await;
        assert!(!requests[0].prompt.contains("Aurora"));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_suppresses_second_suggestion() {
        let provider = Arc::new(MockProvider::new());
        provider
            .push_structured_response(serde_json::json!({
                "themeName": "Sunset", "reason": "warm"
            }))
            .await;
        provider
            .push_structured_response(serde_json::json!({
                "themeName": "Midnight", "reason": "calm"
            }))
            .await;

        let advisor = advisor(provider.clone(), 3600);
        assert!(advisor.suggest("ctx", "Aurora").await.is_some());
        assert!(advisor.suggest("ctx", "Aurora").await.is_none());

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(advisor.suggest("ctx", "Aurora").await.is_some());
    }

    #[tokio::test]
    async fn unknown_or_current_theme_is_dropped() {
        let provider = Arc::new(MockProvider::new());
        provider
            .push_structured_response(serde_json::json!({
                "themeName": "Neon", "reason": "nope"
            }))
            .await;

        let advisor = advisor(provider, 0);
        assert!(advisor.suggest("ctx", "Aurora").await.is_none());
    }

    #[tokio::test]
    async fn provider_failure_is_swallowed() {
        let provider = Arc::new(MockProvider::new());
        provider.push_structured_failure("boom").await;

        let advisor = advisor(provider, 0);
        assert!(advisor.suggest("ctx", "Aurora").await.is_none());
    }

    #[tokio::test]
    async fn no_candidates_means_no_call() {
        let provider = Arc::new(MockProvider::new());
        let advisor = ThemeAdvisor::new(
            provider.clone(),
            vec!["Aurora".into()],
            Duration::from_secs(0),
        );

        assert!(advisor.suggest("ctx", "Aurora").await.is_none());
        assert!(provider.structured_requests().await.is_empty());
    }
}
