// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Marci companion core.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Title given to a freshly created session until background summarization
/// replaces it. The summarization threshold check keys off this sentinel.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Category given to a freshly created session.
pub const GENERAL_CATEGORY: &str = "General";

/// Category assigned to peer-chat sessions.
pub const SOCIAL_CATEGORY: &str = "Social";

/// Current time as epoch milliseconds, the unit used by `ChatSession::created_at`
/// and `ChatMessage::timestamp`.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Speech,
}

// --- Conversation types ---

/// Who produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One turn in a conversation.
///
/// For an in-flight assistant message, `text` grows incrementally as stream
/// deltas are folded in. `is_peer_reply` may only be true on assistant
/// messages; the constructors below are the only places these flags are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    /// Set only on ephemeral messages, reserved for future expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Frozen from the session's temporary-chat mode at creation time.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_ephemeral: bool,
    /// Opaque inline attachment reference; user messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// True when the message was produced by the simulated-peer path.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_peer_reply: bool,
    /// Display name of the simulated peer; set together with `is_peer_reply`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

impl ChatMessage {
    /// A message typed by the local user.
    pub fn user(text: impl Into<String>, image_url: Option<String>, ephemeral: bool) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp: ephemeral.then(now_millis),
            is_ephemeral: ephemeral,
            image_url,
            is_peer_reply: false,
            sender_name: None,
        }
    }

    /// A finalized assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: None,
            is_ephemeral: false,
            image_url: None,
            is_peer_reply: false,
            sender_name: None,
        }
    }

    /// An empty assistant message appended on the first stream delta,
    /// to be grown by subsequent folds.
    pub fn streaming_target(ephemeral: bool) -> Self {
        Self {
            sender: Sender::Assistant,
            text: String::new(),
            timestamp: ephemeral.then(now_millis),
            is_ephemeral: ephemeral,
            image_url: None,
            is_peer_reply: false,
            sender_name: None,
        }
    }

    /// A simulated-peer reply carrying the other participant's display name.
    pub fn peer_reply(text: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: None,
            is_ephemeral: false,
            image_url: None,
            is_peer_reply: true,
            sender_name: Some(sender_name.into()),
        }
    }

    /// Whether this message is the valid target for stream-delta folding:
    /// an assistant message that is not a peer reply.
    pub fn is_streaming_target(&self) -> bool {
        self.sender == Sender::Assistant && !self.is_peer_reply
    }
}

/// Distinguishes a standard assistant chat from a simulated peer chat.
///
/// An explicit tagged variant rather than an optional participants field,
/// so dispatch in the reply engine is exhaustive and checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionKind {
    /// Chat between the local user and the assistant persona.
    Standard,
    /// Simulated chat with a named, AI-impersonated other user.
    Peer { other_user: String },
}

/// One conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique identifier, generated at creation, immutable.
    pub id: String,
    /// Owner identifier; a fixed local value in the single-user deployment.
    pub user_id: String,
    /// Starts as [`NEW_CHAT_TITLE`], replaced once by background summarization.
    pub title: String,
    pub category: String,
    /// Epoch millis; the sort key for most-recent queries.
    pub created_at: i64,
    /// Append-only, except for in-place text growth of the last element
    /// while a stream is in flight.
    pub history: Vec<ChatMessage>,
    #[serde(flatten)]
    pub kind: SessionKind,
}

impl ChatSession {
    pub fn is_peer(&self) -> bool {
        matches!(self.kind, SessionKind::Peer { .. })
    }

    /// Concatenates a stream delta onto the text of the last message,
    /// provided it is a valid streaming target. Returns false otherwise.
    pub fn fold_delta(&mut self, delta: &str) -> bool {
        match self.history.last_mut() {
            Some(last) if last.is_streaming_target() => {
                last.text.push_str(delta);
                true
            }
            _ => false,
        }
    }
}

/// Patch applied to a stored session by background summarization.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub category: Option<String>,
}

/// Mood classification of a user message; informational only.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Mood {
    Happy,
    Calm,
    Focused,
    Energetic,
    #[default]
    Default,
}

// --- Provider types ---

/// One piece of multimodal prompt content.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    /// Base64-encoded inline image data.
    InlineImage { media_type: String, data: String },
}

/// A prior conversation turn sent as context with a streaming request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    /// "user" or "model".
    pub role: String,
    pub parts: Vec<PromptPart>,
}

/// A one-shot free-text completion request.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub prompt: String,
    /// Prefer latency over reasoning depth (disables provider thinking).
    pub fast: bool,
}

/// A one-shot structured-JSON completion request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub prompt: String,
    /// JSON schema the provider must conform its output to.
    pub schema: serde_json::Value,
    pub fast: bool,
}

/// A streaming chat completion request.
#[derive(Debug, Clone)]
pub struct ChatStreamRequest {
    /// Fixed at session-creation/persona-switch time, not re-read per message.
    pub system_instruction: String,
    /// The running conversation, oldest first, excluding the new input.
    pub context: Vec<ChatTurn>,
    /// The new user input (text parts and/or inline image part).
    pub parts: Vec<PromptPart>,
}

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub response_tokens: u32,
}

/// One incremental piece of a streaming completion response.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    /// Text delta to fold into the in-flight assistant message.
    pub text: Option<String>,
    /// Set on the final chunk (e.g. "STOP", "SAFETY", "MAX_TOKENS").
    pub finish_reason: Option<String>,
    /// Usage metadata, typically on the final chunk.
    pub usage: Option<TokenUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_freezes_ephemeral_flag() {
        let msg = ChatMessage::user("hi", None, true);
        assert!(msg.is_ephemeral);
        assert!(msg.timestamp.is_some());

        let msg = ChatMessage::user("hi", None, false);
        assert!(!msg.is_ephemeral);
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn peer_reply_is_assistant_sender() {
        let msg = ChatMessage::peer_reply("yo", "bob");
        assert_eq!(msg.sender, Sender::Assistant);
        assert!(msg.is_peer_reply);
        assert_eq!(msg.sender_name.as_deref(), Some("bob"));
        assert!(!msg.is_streaming_target());
    }

    #[test]
    fn fold_delta_targets_last_streaming_message() {
        let mut session = ChatSession {
            id: "s1".into(),
            user_id: "local".into(),
            title: NEW_CHAT_TITLE.into(),
            category: GENERAL_CATEGORY.into(),
            created_at: 0,
            history: vec![
                ChatMessage::user("hello", None, false),
                ChatMessage::streaming_target(false),
            ],
            kind: SessionKind::Standard,
        };

        assert!(session.fold_delta("Hi "));
        assert!(session.fold_delta("there!"));
        assert_eq!(session.history.last().unwrap().text, "Hi there!");
    }

    #[test]
    fn fold_delta_rejects_user_and_peer_tails() {
        let mut session = ChatSession {
            id: "s1".into(),
            user_id: "local".into(),
            title: NEW_CHAT_TITLE.into(),
            category: GENERAL_CATEGORY.into(),
            created_at: 0,
            history: vec![ChatMessage::user("hello", None, false)],
            kind: SessionKind::Standard,
        };
        assert!(!session.fold_delta("nope"));

        session.history.push(ChatMessage::peer_reply("hey", "bob"));
        assert!(!session.fold_delta("nope"));
        assert_eq!(session.history.last().unwrap().text, "hey");
    }

    #[test]
    fn session_kind_serializes_tagged() {
        let standard = SessionKind::Standard;
        let json = serde_json::to_value(&standard).unwrap();
        assert_eq!(json["kind"], "standard");

        let peer = SessionKind::Peer {
            other_user: "bob".into(),
        };
        let json = serde_json::to_value(&peer).unwrap();
        assert_eq!(json["kind"], "peer");
        assert_eq!(json["other_user"], "bob");

        let parsed: SessionKind = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, peer);
    }

    #[test]
    fn chat_session_roundtrips_through_json() {
        let session = ChatSession {
            id: "s-rt".into(),
            user_id: "local".into(),
            title: "Anime talk".into(),
            category: "Casual".into(),
            created_at: 1_700_000_000_000,
            history: vec![
                ChatMessage::user("hi", Some("data:image/jpeg;base64,abc".into()), false),
                ChatMessage::assistant("hello!"),
            ],
            kind: SessionKind::Peer {
                other_user: "bob".into(),
            },
        };

        let json = serde_json::to_string(&session).unwrap();
        let parsed: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn mood_parses_case_insensitively() {
        use std::str::FromStr;
        assert_eq!(Mood::from_str("happy").unwrap(), Mood::Happy);
        assert_eq!(Mood::from_str("Energetic").unwrap(), Mood::Energetic);
        assert!(Mood::from_str("grumpy").is_err());
    }
}
