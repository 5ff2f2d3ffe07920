//! Conversation session store
//!
//! Bounded in-memory map of session id to history. Sessions are created on
//! first reference, dropped after an idle period, and the least recently
//! used ones are evicted once capacity is reached. Each history sits behind
//! its own lock so calls on one session are serialized while different
//! sessions proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shared::{ConversationTurn, SessionHistory};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::SessionConfig;
use crate::error::{AppError, AppResult};

const MAX_SESSION_ID_LEN: usize = 128;

struct SessionEntry {
    history: Arc<Mutex<SessionHistory>>,
    last_used: Instant,
}

impl SessionEntry {
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.history) > 1
    }
}

/// Session store shared by all advisory calls
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    capacity: usize,
    idle_ttl: Duration,
    max_turns: usize,
}

/// Exclusive access to one session's history for the length of a call
pub struct SessionGuard {
    session_id: String,
    history: OwnedMutexGuard<SessionHistory>,
    max_turns: usize,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.history.push(turn);
        self.history.truncate_front(self.max_turns);
    }
}

impl SessionStore {
    pub fn new(capacity: usize, idle_ttl: Duration, max_turns: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
            idle_ttl,
            // one exchange is two turns
            max_turns: max_turns.max(2),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.capacity,
            Duration::from_secs(config.idle_ttl_secs),
            config.max_turns,
        )
    }

    /// Copy of the history, creating an empty session on first reference.
    pub async fn get_or_create(&self, session_id: &str) -> AppResult<SessionHistory> {
        let history = self.entry(session_id).await?;
        let snapshot = history.lock().await.clone();
        Ok(snapshot)
    }

    /// Append one turn, creating the session if needed.
    pub async fn append(&self, session_id: &str, turn: ConversationTurn) -> AppResult<()> {
        let history = self.entry(session_id).await?;
        let mut history = history.lock().await;
        history.push(turn);
        history.truncate_front(self.max_turns);
        Ok(())
    }

    /// Hold the session until the guard is dropped. A second caller for the
    /// same id waits here, so reading history and appending turns never
    /// interleave across calls.
    pub async fn lock(&self, session_id: &str) -> AppResult<SessionGuard> {
        let history = self.entry(session_id).await?;
        let guard = history.lock_owned().await;
        Ok(SessionGuard {
            session_id: session_id.to_string(),
            history: guard,
            max_turns: self.max_turns,
        })
    }

    /// Copy of an existing session's history, without creating one.
    pub async fn snapshot(&self, session_id: &str) -> Option<SessionHistory> {
        let history = {
            let sessions = self.sessions.lock().await;
            let found = sessions.get(session_id).map(|e| e.history.clone());
            found
        }?;
        let snapshot = history.lock().await.clone();
        Some(snapshot)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn entry(&self, session_id: &str) -> AppResult<Arc<Mutex<SessionHistory>>> {
        validate_session_id(session_id)?;

        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = now;
            return Ok(entry.history.clone());
        }

        self.evict(&mut sessions, now);
        let history = Arc::new(Mutex::new(SessionHistory::new()));
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                history: history.clone(),
                last_used: now,
            },
        );
        tracing::debug!(session_id, live = sessions.len(), "created session");
        Ok(history)
    }

    /// Make room for one new session. Sessions with a call in flight are
    /// never evicted.
    fn evict(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        let ttl = self.idle_ttl;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.in_use() || now.duration_since(entry.last_used) < ttl);

        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| !entry.in_use())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => {
                    tracing::warn!(
                        live = sessions.len(),
                        capacity = self.capacity,
                        "all sessions busy, exceeding capacity"
                    );
                    break;
                }
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted sessions");
        }
    }
}

fn validate_session_id(session_id: &str) -> AppResult<()> {
    if session_id.trim().is_empty() {
        return Err(AppError::invalid_input("session_id", "Session id is required"));
    }
    if session_id.chars().count() > MAX_SESSION_ID_LEN {
        return Err(AppError::invalid_input(
            "session_id",
            "Session id must be at most 128 characters",
        ));
    }
    Ok(())
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
