// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt builders and response parsers for the background side-channels:
//! title/category summarization, mood classification, and peer replies.

use marci_core::{ChatMessage, Mood, Sender};

/// Fallback title applied when summarization fails.
pub const FALLBACK_TITLE: &str = "Chat Summary";

/// Fallback category applied when summarization fails.
pub const FALLBACK_CATEGORY: &str = "General";

/// Output schema for the summarization call.
pub fn summary_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "category": { "type": "STRING" }
        }
    })
}

/// Output schema for the mood classification call.
pub fn mood_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "mood": { "type": "STRING" }
        }
    })
}

/// Builds the summarization prompt from a speaker-labelled transcript.
pub fn summary_prompt(history: &[ChatMessage]) -> String {
    let transcript: Vec<String> = history
        .iter()
        .map(|msg| {
            let speaker = match msg.sender {
                Sender::User => "User",
                Sender::Assistant => "Marci",
            };
            format!("{speaker}: {}", msg.text)
        })
        .collect();

    format!(
        "Based on the following conversation, generate a short, relevant title (less than 5 words) and pick one category from this list: [Productivity, Creative, Learning, Casual]. Conversation: \n\n{}",
        transcript.join("\n")
    )
}

/// Builds the mood classification prompt.
pub fn mood_prompt(text: &str) -> String {
    format!(
        "Analyze the mood of the following text and classify it into one of these categories: [Happy, Calm, Focused, Energetic, Default]. Text: \"{text}\""
    )
}

/// Builds the simulated-peer reply prompt.
pub fn peer_prompt(message: &str, persona: &str) -> String {
    format!(
        "You are acting as a user in a chat application. Your username is '{persona}'. The other user just sent this message: \"{message}\". Write a short, casual, and believable reply."
    )
}

/// Parses a summarization response, falling back field-wise.
pub fn parse_summary(value: &serde_json::Value) -> (String, String) {
    let title = value
        .get("title")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(FALLBACK_TITLE)
        .to_string();
    let category = value
        .get("category")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string();
    (title, category)
}

/// Parses a mood classification response; anything unrecognized is `Default`.
pub fn parse_mood(value: &serde_json::Value) -> Mood {
    value
        .get("mood")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_labels_speakers() {
        let history = vec![
            ChatMessage::user("help me plan a trip", None, false),
            ChatMessage::assistant("Sure! Where to? \u{2708}\u{fe0f}"),
        ];
        let prompt = summary_prompt(&history);
        assert!(prompt.contains("User: help me plan a trip"));
        assert!(prompt.contains("Marci: Sure! Where to?"));
        assert!(prompt.contains("[Productivity, Creative, Learning, Casual]"));
    }

    #[test]
    fn parse_summary_falls_back_field_wise() {
        let full = serde_json::json!({"title": "Trip Plans", "category": "Creative"});
        assert_eq!(
            parse_summary(&full),
            ("Trip Plans".to_string(), "Creative".to_string())
        );

        let partial = serde_json::json!({"title": "Trip Plans"});
        assert_eq!(
            parse_summary(&partial),
            ("Trip Plans".to_string(), FALLBACK_CATEGORY.to_string())
        );

        let empty = serde_json::json!({});
        assert_eq!(
            parse_summary(&empty),
            (FALLBACK_TITLE.to_string(), FALLBACK_CATEGORY.to_string())
        );
    }

    #[test]
    fn parse_mood_defaults_on_garbage() {
        assert_eq!(
            parse_mood(&serde_json::json!({"mood": "Happy"})),
            Mood::Happy
        );
        assert_eq!(
            parse_mood(&serde_json::json!({"mood": "furious"})),
            Mood::Default
        );
        assert_eq!(parse_mood(&serde_json::json!({})), Mood::Default);
    }

    #[test]
    fn peer_prompt_names_the_persona() {
        let prompt = peer_prompt("you up?", "bob");
        assert!(prompt.contains("Your username is 'bob'"));
        assert!(prompt.contains("\"you up?\""));
    }
}
