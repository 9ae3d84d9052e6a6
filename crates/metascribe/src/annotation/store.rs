//! Session registry for services that annotate several datasets at once.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::{MetascribeError, Result};

use super::session::AnnotationSession;

/// Create/get/update/expire access to independent sessions.
///
/// Each id maps to its own session; callers get clones, never shared state.
pub trait SessionStore: Send + Sync {
    /// Register a session and return its id.
    fn create(&self, session: AnnotationSession) -> String;

    fn get(&self, id: &str) -> Result<AnnotationSession>;

    fn update(&self, id: &str, session: AnnotationSession) -> Result<()>;

    /// Abandon a session.
    fn remove(&self, id: &str) -> Result<AnnotationSession>;

    /// Drop sessions idle for longer than `max_age`. Returns how many were dropped.
    fn expire(&self, max_age: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    session: AnnotationSession,
    last_access: DateTime<Utc>,
}

/// Mutex-guarded in-process [`SessionStore`].
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire relative to an explicit clock reading.
    pub fn expire_at(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_access <= max_age);
        let dropped = before - sessions.len();
        if dropped > 0 {
            info!(dropped, "expired idle annotation sessions");
        }
        dropped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, session: AnnotationSession) -> String {
        let id = generate_session_id();
        self.lock().insert(
            id.clone(),
            Entry {
                session,
                last_access: Utc::now(),
            },
        );
        id
    }

    fn get(&self, id: &str) -> Result<AnnotationSession> {
        let mut sessions = self.lock();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| MetascribeError::SessionNotFound(id.to_string()))?;
        entry.last_access = Utc::now();
        Ok(entry.session.clone())
    }

    fn update(&self, id: &str, session: AnnotationSession) -> Result<()> {
        let mut sessions = self.lock();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| MetascribeError::SessionNotFound(id.to_string()))?;
        entry.session = session;
        entry.last_access = Utc::now();
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<AnnotationSession> {
        self.lock()
            .remove(id)
            .map(|entry| entry.session)
            .ok_or_else(|| MetascribeError::SessionNotFound(id.to_string()))
    }

    fn expire(&self, max_age: Duration) -> usize {
        self.expire_at(Utc::now(), max_age)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Generate a unique session ID.
fn generate_session_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!(
        "ses_{}_{:04}",
        Utc::now().format("%Y%m%d%H%M%S"),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}
