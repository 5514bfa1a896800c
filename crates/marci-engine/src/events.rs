// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine event channel.
//!
//! Delta application is decoupled from delta observation: the engine folds
//! stream deltas into the store and publishes an event per fold, plus
//! lifecycle events. Observers subscribe here and never touch the provider
//! stream.

use marci_core::Mood;

/// Events published by the engine on its broadcast channel.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The named session's content changed (message appended, delta folded,
    /// summarization patch applied).
    SessionChanged { session_id: String },
    /// A different session became current.
    CurrentChanged { session_id: String },
    /// A stream delta was folded into the session's in-flight reply.
    Delta { session_id: String, text: String },
    /// The turn finished and its reply (if any) was finalized.
    TurnCompleted { session_id: String },
    /// The turn failed; `message` is the user-facing error text already
    /// recorded in the session.
    TurnFailed { session_id: String, message: String },
    /// A standard-path turn genuinely succeeded; carries the user's prompt
    /// for interested advisors.
    GenerationSucceeded { prompt: String },
    /// A finalized reply is ready to be spoken.
    SpeechReady { text: String },
    /// The mood side-channel classified the user's message.
    MoodDetected { mood: Mood },
}
