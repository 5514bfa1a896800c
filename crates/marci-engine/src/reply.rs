// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The streaming turn state machine.
//!
//! A dispatched turn owns a captured (session id, turn id) pair. Every fold
//! of a stream delta re-checks that pair against the live turn table and the
//! store, so replies land in the session that started them or nowhere.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tracing::{debug, warn};

use marci_core::{
    ChatMessage, ChatStreamRequest, ChatTurn, MarciError, PromptPart, SessionPatch,
    StructuredRequest, TextRequest, NEW_CHAT_TITLE,
};

use crate::events::EngineEvent;
use crate::summary::{
    mood_prompt, mood_schema, parse_mood, parse_summary, peer_prompt, summary_prompt,
    summary_schema, FALLBACK_CATEGORY, FALLBACK_TITLE,
};
use crate::EngineShared;

/// Maps a provider failure to the companion's voice, mirroring the error the
/// user would otherwise see raw.
pub(crate) fn user_facing_error(err: &MarciError) -> String {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if message.contains("API key")
        || message.contains("API_KEY")
        || lower.contains("unauthenticated")
        || lower.contains("permission_denied")
    {
        "My core systems are reporting an authentication error. The API key might be invalid. Please alert the administrator.".to_string()
    } else if message.contains("429") || message.contains("RESOURCE_EXHAUSTED") {
        "I'm experiencing high traffic right now! Please wait a moment and try again.".to_string()
    } else if lower.contains("network")
        || lower.contains("failed to fetch")
        || lower.contains("http request failed")
    {
        "I can't seem to connect to my creative core. Please check your internet connection."
            .to_string()
    } else if message.contains("SAFETY") {
        "My safety protocols were triggered for this reply. Please try a different prompt."
            .to_string()
    } else {
        format!("An unexpected issue occurred while generating a reply: {message}")
    }
}

/// Fires the mood side-channel for a standard turn's user text. Never
/// blocks the turn; failures are logged and swallowed.
pub(crate) fn spawn_mood_analysis(shared: Arc<EngineShared>, text: String) {
    if text.trim().is_empty() {
        return;
    }
    tokio::spawn(async move {
        let request = StructuredRequest {
            prompt: mood_prompt(&text),
            schema: mood_schema(),
            fast: true,
        };
        match shared.provider.complete_structured(request).await {
            Ok(value) => {
                let mood = parse_mood(&value);
                debug!(%mood, "mood detected");
                shared.emit(EngineEvent::MoodDetected { mood });
            }
            Err(e) => warn!(error = %e, "mood analysis failed"),
        }
    });
}

/// Runs a standard-path turn: stream the reply, fold deltas into the
/// captured session, then finalize (speech, summarization check).
pub(crate) async fn run_standard_turn(
    shared: Arc<EngineShared>,
    session_id: String,
    turn: u64,
    prompt_text: String,
    parts: Vec<PromptPart>,
    context: Vec<ChatTurn>,
    instruction: String,
    ephemeral: bool,
) {
    let request = ChatStreamRequest {
        system_instruction: instruction,
        context,
        parts,
    };

    let mut stream = match shared.provider.stream_chat(request).await {
        Ok(stream) => stream,
        Err(e) => {
            fail_turn(&shared, &session_id, turn, false, &e).await;
            return;
        }
    };

    let mut started = false;
    let mut full_text = String::new();

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                let Some(delta) = chunk.text.filter(|t| !t.is_empty()) else {
                    continue;
                };
                if !shared.turn_is_current(&session_id, turn) {
                    // The turn was superseded; drain without applying.
                    continue;
                }
                let first = !started;
                let applied = {
                    let delta = delta.clone();
                    shared
                        .store
                        .mutate(&session_id, move |session| {
                            if first {
                                session.history.push(ChatMessage::streaming_target(ephemeral));
                            }
                            session.fold_delta(&delta);
                        })
                        .await
                };
                match applied {
                    Ok(true) => {
                        started = true;
                        full_text.push_str(&delta);
                        shared.emit(EngineEvent::Delta {
                            session_id: session_id.clone(),
                            text: delta,
                        });
                        shared.emit(EngineEvent::SessionChanged {
                            session_id: session_id.clone(),
                        });
                    }
                    // Session deleted mid-stream: keep draining, apply nothing.
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "failed to persist stream delta"),
                }
            }
            Err(e) => {
                fail_turn(&shared, &session_id, turn, started, &e).await;
                return;
            }
        }
    }

    shared.finish_turn(&session_id, turn);
    shared.emit(EngineEvent::TurnCompleted {
        session_id: session_id.clone(),
    });
    shared.emit(EngineEvent::GenerationSucceeded {
        prompt: prompt_text,
    });

    if shared.config.speech_enabled && !full_text.is_empty() {
        if let Some(speech) = &shared.speech {
            if let Err(e) = speech.speak(&full_text).await {
                warn!(error = %e, "speech output failed");
            }
        }
        shared.emit(EngineEvent::SpeechReady { text: full_text });
    }

    maybe_summarize(&shared, &session_id).await;
}

/// Runs a peer-path turn: wait a believable delay, then append a single
/// tagged reply from a one-shot completion. No speech, no summarization,
/// no mood analysis.
pub(crate) async fn run_peer_turn(
    shared: Arc<EngineShared>,
    session_id: String,
    turn: u64,
    message: String,
    other_user: String,
) {
    let delay_ms = rand::thread_rng()
        .gen_range(shared.config.peer_delay_min_ms..=shared.config.peer_delay_max_ms);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    let request = TextRequest {
        prompt: peer_prompt(&message, &other_user),
        fast: true,
    };
    match shared.provider.complete_text(request).await {
        Ok(reply) => {
            if shared.turn_is_current(&session_id, turn) {
                let applied = shared
                    .store
                    .mutate(&session_id, move |session| {
                        session
                            .history
                            .push(ChatMessage::peer_reply(reply, other_user));
                    })
                    .await;
                match applied {
                    Ok(true) => shared.emit(EngineEvent::SessionChanged {
                        session_id: session_id.clone(),
                    }),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "failed to persist peer reply"),
                }
            }
            shared.finish_turn(&session_id, turn);
            shared.emit(EngineEvent::TurnCompleted { session_id });
        }
        Err(e) => {
            fail_turn(&shared, &session_id, turn, false, &e).await;
        }
    }
}

/// Records a turn failure: substitute the dangling streaming message (or
/// append a fresh assistant message) with friendly error text, then clear
/// the in-flight flag.
async fn fail_turn(
    shared: &EngineShared,
    session_id: &str,
    turn: u64,
    replace_dangling: bool,
    err: &MarciError,
) {
    warn!(session_id, error = %err, "turn failed");
    let message = user_facing_error(err);

    if shared.turn_is_current(session_id, turn) {
        let text = message.clone();
        let applied = shared
            .store
            .mutate(session_id, move |session| {
                match session.history.last_mut() {
                    Some(last) if replace_dangling && last.is_streaming_target() => {
                        last.text = text;
                    }
                    _ => session.history.push(ChatMessage::assistant(text)),
                }
            })
            .await;
        match applied {
            Ok(true) => shared.emit(EngineEvent::SessionChanged {
                session_id: session_id.to_string(),
            }),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "failed to record turn error"),
        }
    }

    shared.finish_turn(session_id, turn);
    shared.emit(EngineEvent::TurnFailed {
        session_id: session_id.to_string(),
        message,
    });
}

/// Summarizes an untitled standard session once it reaches the configured
/// history length. One-shot per session; failures fall back to a fixed
/// title and category; patches against deleted sessions vanish silently.
async fn maybe_summarize(shared: &EngineShared, session_id: &str) {
    let Some(session) = shared.store.get(session_id).await else {
        return;
    };
    if session.is_peer()
        || session.title != NEW_CHAT_TITLE
        || session.history.len() < shared.config.summary_threshold
    {
        return;
    }
    {
        let mut summarized = shared.summarized.lock().expect("summarized lock poisoned");
        if !summarized.insert(session_id.to_string()) {
            return;
        }
    }

    let request = StructuredRequest {
        prompt: summary_prompt(&session.history),
        schema: summary_schema(),
        fast: false,
    };
    let (title, category) = match shared.provider.complete_structured(request).await {
        Ok(value) => parse_summary(&value),
        Err(e) => {
            warn!(error = %e, "summarization failed, using fallback");
            (FALLBACK_TITLE.to_string(), FALLBACK_CATEGORY.to_string())
        }
    };
    debug!(session_id, title, category, "session summarized");

    let patch = SessionPatch {
        title: Some(title),
        category: Some(category),
    };
    match shared.store.apply_patch(session_id, patch).await {
        Ok(true) => shared.emit(EngineEvent::SessionChanged {
            session_id: session_id.to_string(),
        }),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "failed to apply summary patch"),
    }
}
