// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session lifecycle and streaming reply engine.
//!
//! The engine owns the set of sessions, a current-session pointer, and the
//! turn table that enforces at most one in-flight reply per session. Replies
//! are generated on spawned tasks that fold provider stream deltas into the
//! store and publish [`EngineEvent`]s; observers (shells, advisors, speech)
//! subscribe to the broadcast channel and never touch the provider stream.

pub mod events;
pub mod persona;
pub mod summary;
pub mod theme;

mod reply;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use marci_core::{
    ChatMessage, ChatSession, ChatTurn, MarciError, PromptPart, ProviderAdapter, Sender,
    SessionKind, SpeechAdapter, GENERAL_CATEGORY, NEW_CHAT_TITLE, SOCIAL_CATEGORY,
};
use marci_storage::SessionStore;

pub use events::EngineEvent;
pub use persona::Persona;
pub use theme::{ThemeAdvisor, ThemeSuggestion};

/// Capacity of the engine's broadcast channel. Slow observers that fall
/// further behind than this lose the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Engine tuning knobs, sourced from configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// History length at which an untitled session is summarized.
    pub summary_threshold: usize,
    /// Lower bound of the simulated peer typing delay.
    pub peer_delay_min_ms: u64,
    /// Upper bound of the simulated peer typing delay.
    pub peer_delay_max_ms: u64,
    /// Whether finalized standard replies are sent to the speech adapter.
    pub speech_enabled: bool,
    /// Display name of the local user; also the session owner id.
    pub local_user: String,
    /// Override for the default persona's system instruction.
    pub system_instruction: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            summary_threshold: 4,
            peer_delay_min_ms: 500,
            peer_delay_max_ms: 1500,
            speech_enabled: true,
            local_user: "User".to_string(),
            system_instruction: None,
        }
    }
}

/// An inline image attached to an outgoing message, already base64-encoded.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Default)]
struct TurnState {
    in_flight: bool,
    turn: u64,
}

struct EngineState {
    current: String,
    persona: Persona,
    custom_instruction: Option<String>,
    ephemeral: bool,
}

/// State shared between the engine handle and its spawned reply tasks.
pub(crate) struct EngineShared {
    pub(crate) store: SessionStore,
    pub(crate) provider: Arc<dyn ProviderAdapter>,
    pub(crate) speech: Option<Arc<dyn SpeechAdapter>>,
    pub(crate) config: EngineConfig,
    events: broadcast::Sender<EngineEvent>,
    state: StdMutex<EngineState>,
    turns: StdMutex<HashMap<String, TurnState>>,
    pub(crate) summarized: StdMutex<HashSet<String>>,
}

impl EngineShared {
    pub(crate) fn emit(&self, event: EngineEvent) {
        // A send error just means nobody is subscribed right now.
        let _ = self.events.send(event);
    }

    /// Whether the captured (session, turn) pair is still the live one.
    pub(crate) fn turn_is_current(&self, session_id: &str, turn: u64) -> bool {
        let turns = self.turns.lock().expect("turn table poisoned");
        turns
            .get(session_id)
            .is_some_and(|t| t.in_flight && t.turn == turn)
    }

    /// Clears the in-flight flag if the captured turn is still the live one.
    pub(crate) fn finish_turn(&self, session_id: &str, turn: u64) {
        let mut turns = self.turns.lock().expect("turn table poisoned");
        if let Some(t) = turns.get_mut(session_id)
            && t.turn == turn
        {
            t.in_flight = false;
        }
    }
}

/// Extracts a peer username from an `@mention` message.
///
/// Word characters after the `@` form the name; everything after the first
/// non-word character is dropped.
fn parse_mention(text: &str) -> Option<String> {
    let rest = text.strip_prefix('@')?;
    let name: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// The session lifecycle and reply engine.
///
/// Cheap to clone is not a goal; hold it in an `Arc` if multiple owners
/// need it. All spawned work goes through the inner shared state.
pub struct ChatEngine {
    shared: Arc<EngineShared>,
}

impl ChatEngine {
    /// Loads persisted sessions and restores the most recent one as current,
    /// creating a fresh session when the store is empty.
    pub async fn new(
        store: SessionStore,
        provider: Arc<dyn ProviderAdapter>,
        speech: Option<Arc<dyn SpeechAdapter>>,
        config: EngineConfig,
    ) -> Result<Self, MarciError> {
        store.load().await?;

        let custom_instruction = config.system_instruction.clone();
        let engine = Self {
            shared: Arc::new(EngineShared {
                store,
                provider,
                speech,
                config,
                events: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
                state: StdMutex::new(EngineState {
                    current: String::new(),
                    persona: Persona::default(),
                    custom_instruction,
                    ephemeral: false,
                }),
                turns: StdMutex::new(HashMap::new()),
                summarized: StdMutex::new(HashSet::new()),
            }),
        };

        match engine.shared.store.most_recent().await {
            Some(session) => {
                info!(session_id = %session.id, "restored most recent session");
                engine.set_current(session.id);
            }
            None => {
                engine.new_chat().await?;
            }
        }
        Ok(engine)
    }

    /// Subscribes to the engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    fn set_current(&self, session_id: String) {
        {
            let mut state = self.shared.state.lock().expect("engine state poisoned");
            state.current = session_id.clone();
        }
        self.shared.emit(EngineEvent::CurrentChanged { session_id });
    }

    /// Id of the current session.
    pub fn current_session_id(&self) -> String {
        self.shared
            .state
            .lock()
            .expect("engine state poisoned")
            .current
            .clone()
    }

    /// Snapshot of the current session.
    pub async fn current_session(&self) -> Option<ChatSession> {
        let id = self.current_session_id();
        self.shared.store.get(&id).await
    }

    /// All sessions, most recently created first.
    pub async fn sessions(&self) -> Vec<ChatSession> {
        self.shared.store.list().await
    }

    pub fn persona(&self) -> Persona {
        self.shared.state.lock().expect("engine state poisoned").persona
    }

    pub fn ephemeral_mode(&self) -> bool {
        self.shared.state.lock().expect("engine state poisoned").ephemeral
    }

    /// Toggles temporary-chat mode. Applies to messages sent from now on;
    /// flags already frozen onto existing messages do not change.
    pub fn set_ephemeral_mode(&self, enabled: bool) {
        self.shared.state.lock().expect("engine state poisoned").ephemeral = enabled;
    }

    /// Creates a fresh standard session for the active persona and makes it
    /// current. The anime persona seeds its greeting.
    pub async fn new_chat(&self) -> Result<String, MarciError> {
        let persona = self.persona();
        let history = persona.greeting().into_iter().collect();
        let session = ChatSession {
            id: Uuid::new_v4().to_string(),
            user_id: self.shared.config.local_user.clone(),
            title: NEW_CHAT_TITLE.to_string(),
            category: GENERAL_CATEGORY.to_string(),
            created_at: marci_core::now_millis(),
            history,
            kind: SessionKind::Standard,
        };
        let id = session.id.clone();
        self.shared.store.insert(session).await?;
        debug!(session_id = %id, %persona, "created session");
        self.shared
            .emit(EngineEvent::SessionChanged { session_id: id.clone() });
        self.set_current(id.clone());
        Ok(id)
    }

    /// Creates a peer-chat session with the named simulated user and makes
    /// it current.
    pub async fn start_peer_chat(&self, username: &str) -> Result<String, MarciError> {
        let session = ChatSession {
            id: Uuid::new_v4().to_string(),
            user_id: self.shared.config.local_user.clone(),
            title: format!("Chat with {username}"),
            category: SOCIAL_CATEGORY.to_string(),
            created_at: marci_core::now_millis(),
            history: Vec::new(),
            kind: SessionKind::Peer {
                other_user: username.to_string(),
            },
        };
        let id = session.id.clone();
        self.shared.store.insert(session).await?;
        info!(session_id = %id, username, "started peer chat");
        self.shared
            .emit(EngineEvent::SessionChanged { session_id: id.clone() });
        self.set_current(id.clone());
        Ok(id)
    }

    /// Makes an existing session current.
    pub async fn select_session(&self, session_id: &str) -> Result<(), MarciError> {
        if self.shared.store.get(session_id).await.is_none() {
            return Err(MarciError::Internal(format!(
                "unknown session: {session_id}"
            )));
        }
        self.set_current(session_id.to_string());
        Ok(())
    }

    /// Deletes a session. Any in-flight turn for it keeps draining but folds
    /// nothing. When the current session is deleted the most recent remaining
    /// one becomes current, or a fresh session is created so there is always
    /// at least one.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), MarciError> {
        self.shared.store.delete(session_id).await?;
        {
            let mut turns = self.shared.turns.lock().expect("turn table poisoned");
            turns.remove(session_id);
        }
        {
            let mut summarized = self.shared.summarized.lock().expect("summarized lock poisoned");
            summarized.remove(session_id);
        }

        if self.current_session_id() == session_id {
            match self.shared.store.most_recent().await {
                Some(session) => self.set_current(session.id),
                None => {
                    self.new_chat().await?;
                }
            }
        }
        Ok(())
    }

    /// Deletes every session and starts over with a fresh one.
    pub async fn clear_all(&self) -> Result<(), MarciError> {
        self.shared.store.clear().await?;
        self.shared.turns.lock().expect("turn table poisoned").clear();
        self.shared
            .summarized
            .lock()
            .expect("summarized lock poisoned")
            .clear();
        self.new_chat().await?;
        Ok(())
    }

    /// Switches the active persona and always starts a fresh session, so
    /// conversation context never crosses persona boundaries.
    pub async fn switch_persona(&self, persona: Persona) -> Result<String, MarciError> {
        {
            let mut state = self.shared.state.lock().expect("engine state poisoned");
            state.persona = persona;
        }
        info!(%persona, "switched persona");
        self.new_chat().await
    }

    /// Replaces the default persona's system instruction and starts a fresh
    /// session under the new instruction.
    pub async fn set_custom_instruction(
        &self,
        instruction: Option<String>,
    ) -> Result<String, MarciError> {
        {
            let mut state = self.shared.state.lock().expect("engine state poisoned");
            state.custom_instruction = instruction;
        }
        self.new_chat().await
    }

    /// Sends a message in the current session and dispatches reply
    /// generation.
    ///
    /// Returns the reply task's handle, or `None` when nothing was
    /// dispatched: empty input, an `@mention` that opened a peer chat
    /// instead, or a reply already in flight for this session.
    pub async fn send_message(
        &self,
        text: &str,
        image: Option<ImageAttachment>,
    ) -> Result<Option<JoinHandle<()>>, MarciError> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Ok(None);
        }

        let session_id = self.current_session_id();
        let Some(session) = self.shared.store.get(&session_id).await else {
            return Err(MarciError::Internal(format!(
                "current session vanished: {session_id}"
            )));
        };

        // An @mention opens a fresh peer chat with the named user, from any
        // session kind; the message itself is not recorded anywhere.
        if let Some(username) = parse_mention(text) {
            self.start_peer_chat(&username).await?;
            return Ok(None);
        }

        // Claim the turn before spawning anything. One lock acquisition
        // makes check-and-claim atomic.
        let turn = {
            let mut turns = self.shared.turns.lock().expect("turn table poisoned");
            let entry = turns.entry(session_id.clone()).or_default();
            if entry.in_flight {
                debug!(session_id, "reply already in flight, input dropped");
                return Ok(None);
            }
            entry.in_flight = true;
            entry.turn += 1;
            entry.turn
        };

        let (instruction, ephemeral) = {
            let state = self.shared.state.lock().expect("engine state poisoned");
            (
                state.persona.system_instruction(state.custom_instruction.as_deref()),
                state.ephemeral,
            )
        };

        // Context is the history before this message; empty-text entries
        // (dangling stream targets) are skipped.
        let context: Vec<ChatTurn> = session
            .history
            .iter()
            .filter(|m| !m.text.is_empty())
            .map(|m| ChatTurn {
                role: match m.sender {
                    Sender::User => "user".to_string(),
                    Sender::Assistant => "model".to_string(),
                },
                parts: vec![PromptPart::Text(m.text.clone())],
            })
            .collect();

        let image_url = image
            .as_ref()
            .map(|img| format!("data:{};base64,{}", img.media_type, img.data));
        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(PromptPart::Text(text.to_string()));
        }
        if let Some(img) = image {
            parts.push(PromptPart::InlineImage {
                media_type: img.media_type,
                data: img.data,
            });
        }

        let user_message = ChatMessage::user(text, image_url, ephemeral);
        let appended = self
            .shared
            .store
            .mutate(&session_id, move |s| s.history.push(user_message))
            .await;
        match appended {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                self.shared.finish_turn(&session_id, turn);
                return appended.map(|_| None);
            }
        }
        self.shared.emit(EngineEvent::SessionChanged {
            session_id: session_id.clone(),
        });

        let shared = self.shared.clone();
        let handle = match session.kind {
            SessionKind::Standard => {
                // A new send silences whatever reply is still being spoken.
                if let Some(speech) = &self.shared.speech {
                    if let Err(e) = speech.stop().await {
                        warn!(error = %e, "failed to stop speech output");
                    }
                }
                reply::spawn_mood_analysis(self.shared.clone(), text.to_string());
                tokio::spawn(reply::run_standard_turn(
                    shared,
                    session_id,
                    turn,
                    text.to_string(),
                    parts,
                    context,
                    instruction,
                    ephemeral,
                ))
            }
            SessionKind::Peer { other_user } => tokio::spawn(reply::run_peer_turn(
                shared,
                session_id,
                turn,
                text.to_string(),
                other_user,
            )),
        };
        Ok(Some(handle))
    }
}
