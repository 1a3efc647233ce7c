use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthCookieJar;
use crate::config::UpstreamConfig;

/// Opaque bearer token handed to a caller after login.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Always lower-cased
    pub username: String,
    /// Fixed at login; never refreshed
    pub cookies: AuthCookieJar,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() > self.created_at + ttl
    }
}

/// In-memory registry of logged-in callers.
///
/// Shared between request tasks behind an `Arc`. Records expire after the
/// configured TTL and the oldest record is evicted once `max_sessions` is
/// reached. Nothing survives a restart.
pub struct SessionStore {
    ttl: Duration,
    max_sessions: usize,
    sessions: RwLock<HashMap<SessionId, Arc<SessionRecord>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            ttl,
            max_sessions: max_sessions.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.session_ttl(), config.max_sessions)
    }

    /// Register a logged-in caller and return their new token
    pub fn create(&self, cookies: AuthCookieJar, username: &str) -> SessionId {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        let ttl = self.ttl;
        sessions.retain(|_, record| !record.is_expired(ttl));
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .values()
                .min_by_key(|record| record.created_at)
                .map(Arc::clone);
            match oldest {
                Some(record) => {
                    debug!(username = %record.username, "Session store full, evicting oldest");
                    sessions.remove(&record.id);
                }
                None => break,
            }
        }

        let mut id = SessionId::generate();
        while sessions.contains_key(&id) {
            id = SessionId::generate();
        }

        let record = SessionRecord {
            id: id.clone(),
            username: username.to_lowercase(),
            cookies,
            created_at: Utc::now(),
        };
        info!(username = %record.username, "Session created");
        sessions.insert(id.clone(), Arc::new(record));
        id
    }

    /// Look up a live session. Expired records are removed and reported as absent.
    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionRecord>> {
        {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            match sessions.get(id) {
                None => return None,
                Some(record) if !record.is_expired(self.ttl) => return Some(Arc::clone(record)),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = sessions.get(id).filter(|record| record.is_expired(self.ttl)) {
            debug!(username = %record.username, "Session expired");
            sessions.remove(id);
        }
        None
    }

    /// Remove a session. Returns whether it existed.
    pub fn invalidate(&self, id: &SessionId) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(record) = &removed {
            info!(username = %record.username, "Session invalidated");
        }
        removed.is_some()
    }

    /// Drop every expired record, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(ttl));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
