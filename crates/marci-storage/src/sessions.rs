// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session store: the full session map serialized as one JSON blob
//! under a fixed key of the key-value store.
//!
//! An in-memory map is the source of truth between writes; every mutation
//! rewrites the whole blob. The write lock is held across the persist call
//! so that blobs reach the store in mutation order.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use marci_core::{ChatSession, KeyValueAdapter, MarciError, SessionPatch};

/// Key under which the whole session map is stored.
pub const SESSIONS_KEY: &str = "marci.chat_sessions";

/// Store of all chat sessions, keyed by session id.
pub struct SessionStore {
    kv: Arc<dyn KeyValueAdapter>,
    cache: Mutex<HashMap<String, ChatSession>>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueAdapter>) -> Self {
        Self {
            kv,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the session map from the store.
    ///
    /// A missing blob starts empty. A corrupt blob logs a warning and starts
    /// empty rather than failing startup.
    pub async fn load(&self) -> Result<(), MarciError> {
        let sessions = match self.kv.get(SESSIONS_KEY).await? {
            Some(blob) => match serde_json::from_str::<HashMap<String, ChatSession>>(&blob) {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, "session blob is corrupt, starting with an empty map");
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };
        debug!(count = sessions.len(), "sessions loaded");
        *self.cache.lock().await = sessions;
        Ok(())
    }

    async fn persist(
        &self,
        sessions: &HashMap<String, ChatSession>,
    ) -> Result<(), MarciError> {
        let blob = serde_json::to_string(sessions)
            .map_err(|e| MarciError::Internal(format!("session serialization failed: {e}")))?;
        self.kv.put(SESSIONS_KEY, &blob).await
    }

    /// Inserts a new session.
    pub async fn insert(&self, session: ChatSession) -> Result<(), MarciError> {
        let mut cache = self.cache.lock().await;
        cache.insert(session.id.clone(), session);
        self.persist(&cache).await
    }

    /// Returns a snapshot of the session, if it exists.
    pub async fn get(&self, id: &str) -> Option<ChatSession> {
        self.cache.lock().await.get(id).cloned()
    }

    /// Applies `f` to the session and persists the result.
    ///
    /// Returns `Ok(false)` without touching the store when the session does
    /// not exist; updates against deleted sessions are silent no-ops.
    pub async fn mutate<F>(&self, id: &str, f: F) -> Result<bool, MarciError>
    where
        F: FnOnce(&mut ChatSession),
    {
        let mut cache = self.cache.lock().await;
        let Some(session) = cache.get_mut(id) else {
            return Ok(false);
        };
        f(session);
        self.persist(&cache).await?;
        Ok(true)
    }

    /// Applies a title/category patch. Silent no-op for absent sessions.
    pub async fn apply_patch(&self, id: &str, patch: SessionPatch) -> Result<bool, MarciError> {
        self.mutate(id, |session| {
            if let Some(title) = patch.title {
                session.title = title;
            }
            if let Some(category) = patch.category {
                session.category = category;
            }
        })
        .await
    }

    /// Removes the session. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, MarciError> {
        let mut cache = self.cache.lock().await;
        let existed = cache.remove(id).is_some();
        if existed {
            self.persist(&cache).await?;
        }
        Ok(existed)
    }

    /// Returns all sessions, most recently created first.
    pub async fn list(&self) -> Vec<ChatSession> {
        let mut sessions: Vec<ChatSession> = self.cache.lock().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    /// Returns the most recently created session, if any.
    pub async fn most_recent(&self) -> Option<ChatSession> {
        self.cache
            .lock()
            .await
            .values()
            .max_by_key(|s| s.created_at)
            .cloned()
    }

    /// Removes every session.
    pub async fn clear(&self) -> Result<(), MarciError> {
        let mut cache = self.cache.lock().await;
        cache.clear();
        self.persist(&cache).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marci_config::model::StorageConfig;
    use marci_core::{ChatMessage, SessionKind, GENERAL_CATEGORY, NEW_CHAT_TITLE};
    use tempfile::tempdir;

    use crate::kv::SqliteKv;

    async fn open_store(dir: &std::path::Path) -> SessionStore {
        let kv = SqliteKv::new(StorageConfig {
            database_path: dir.join("sessions.db").to_string_lossy().into_owned(),
        });
        kv.initialize().await.unwrap();
        let store = SessionStore::new(Arc::new(kv));
        store.load().await.unwrap();
        store
    }

    fn session(id: &str, created_at: i64) -> ChatSession {
        ChatSession {
            id: id.to_string(),
            user_id: "local".to_string(),
            title: NEW_CHAT_TITLE.to_string(),
            category: GENERAL_CATEGORY.to_string(),
            created_at,
            history: Vec::new(),
            kind: SessionKind::Standard,
        }
    }

    #[tokio::test]
    async fn insert_get_delete() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.insert(session("s1", 10)).await.unwrap();
        assert_eq!(store.get("s1").await.unwrap().id, "s1");

        assert!(store.delete("s1").await.unwrap());
        assert!(store.get("s1").await.is_none());
        assert!(!store.delete("s1").await.unwrap());
    }

    #[tokio::test]
    async fn mutate_on_deleted_session_is_silent_noop() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;

        let touched = store
            .mutate("gone", |s| s.history.push(ChatMessage::assistant("late")))
            .await
            .unwrap();
        assert!(!touched);

        let touched = store
            .apply_patch(
                "gone",
                SessionPatch {
                    title: Some("Late Title".into()),
                    category: None,
                },
            )
            .await
            .unwrap();
        assert!(!touched);
    }

    #[tokio::test]
    async fn apply_patch_updates_title_and_category() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.insert(session("s1", 10)).await.unwrap();

        store
            .apply_patch(
                "s1",
                SessionPatch {
                    title: Some("Rust Questions".into()),
                    category: Some("Learning".into()),
                },
            )
            .await
            .unwrap();

        let s = store.get("s1").await.unwrap();
        assert_eq!(s.title, "Rust Questions");
        assert_eq!(s.category, "Learning");
    }

    #[tokio::test]
    async fn list_orders_most_recent_first() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.insert(session("old", 10)).await.unwrap();
        store.insert(session("new", 30)).await.unwrap();
        store.insert(session("mid", 20)).await.unwrap();

        let ids: Vec<String> = store.list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(store.most_recent().await.unwrap().id, "new");
    }

    #[tokio::test]
    async fn sessions_survive_reload() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(SqliteKv::new(StorageConfig {
            database_path: dir.path().join("reload.db").to_string_lossy().into_owned(),
        }));
        kv.initialize().await.unwrap();

        let store = SessionStore::new(kv.clone());
        store.load().await.unwrap();
        let mut s = session("s1", 10);
        s.history.push(ChatMessage::user("hello", None, false));
        store.insert(s).await.unwrap();

        let store = SessionStore::new(kv);
        store.load().await.unwrap();
        let s = store.get("s1").await.unwrap();
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.history[0].text, "hello");
    }

    #[tokio::test]
    async fn corrupt_blob_starts_empty() {
        let dir = tempdir().unwrap();
        let kv = Arc::new(SqliteKv::new(StorageConfig {
            database_path: dir.path().join("corrupt.db").to_string_lossy().into_owned(),
        }));
        kv.initialize().await.unwrap();
        kv.put(SESSIONS_KEY, "{not json").await.unwrap();

        let store = SessionStore::new(kv);
        store.load().await.unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.insert(session("s1", 10)).await.unwrap();
        store.insert(session("s2", 20)).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.list().await.is_empty());
    }
}
