//! Conversation sessions
//!
//! One session per LINE user, kept in memory. A session holds the completed
//! turns (user message and final reply) so follow-up questions have context.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::agent::types::{Message, Role};
use crate::error::{Error, Result};

/// A conversation session
#[derive(Debug, Clone)]
pub struct Session {
    /// Session ID, `session_{user_id}`
    pub id: String,
    /// LINE user ID
    pub user_id: String,
    /// Completed turns, oldest first
    pub messages: Vec<Message>,
    /// When the session started
    pub created_at: DateTime<Utc>,
    last_active: Instant,
}

impl Session {
    /// Create an empty session
    pub fn new(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Session {
            id: session_id(&user_id),
            user_id,
            messages: Vec::new(),
            created_at: Utc::now(),
            last_active: Instant::now(),
        }
    }

    /// Add a message, dropping the oldest beyond `limit`
    pub fn add_message(&mut self, message: Message, limit: usize) {
        self.messages.push(message);
        let excess = self.messages.len().saturating_sub(limit);
        self.messages.drain(..excess);
        self.touch();
    }

    /// Get the last N messages
    pub fn recent_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Get the last assistant message, if any
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_active.elapsed() > ttl
    }
}

/// Session ID for a user
pub fn session_id(user_id: &str) -> String {
    format!("session_{}", user_id)
}

/// In-memory session store
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    history_limit: usize,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store keeping `history_limit` messages per session
    pub fn new(history_limit: usize, ttl: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            history_limit,
            ttl,
        }
    }

    /// Session ID for a user, creating the session if needed
    ///
    /// Idle sessions past the TTL are dropped first, so an expired user
    /// starts over with empty history.
    pub async fn get_or_create(&self, user_id: &str) -> String {
        let mut sessions = self.sessions.write().await;

        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(ttl));
        if sessions.len() < before {
            debug!("Dropped {} idle sessions", before - sessions.len());
        }

        let id = session_id(user_id);
        sessions
            .entry(id.clone())
            .or_insert_with(|| {
                debug!("Creating session {}", id);
                Session::new(user_id)
            })
            .touch();
        id
    }

    /// History of a session, oldest first
    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.messages.clone())
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Record a completed turn
    pub async fn append_turn(&self, session_id: &str, user: Message, reply: Message) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        session.add_message(user, self.history_limit);
        session.add_message(reply, self.history_limit);
        Ok(())
    }

    /// Drop a user's session
    pub async fn remove(&self, user_id: &str) -> Option<Session> {
        self.sessions.write().await.remove(&session_id(user_id))
    }

    /// Snapshot of a user's session
    pub async fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.read().await.get(&session_id(user_id)).cloned()
    }

    /// Count live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
