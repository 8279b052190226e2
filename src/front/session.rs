//! In-process login sessions keyed by a random cookie value.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use axum::http::{header, HeaderMap};
use uuid::Uuid;

pub const COOKIE_NAME: &str = "obras_session";

/// How long a login stays valid without logging out.
pub const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub user_name: String,
}

struct Entry {
    session: Session,
    opened_at: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    r: Arc<RwLock<HashMap<Uuid, Entry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            r: Arc::default(),
            ttl,
        }
    }

    /// Stores the session and returns the `Set-Cookie` value for it.
    /// Expired sessions are dropped first.
    pub fn open(&self, session: Session) -> String {
        let id = Uuid::new_v4();
        log::info!("session opened for user {}", session.user_id);

        let now = Instant::now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, e| now.duration_since(e.opened_at) < self.ttl);
        if sessions.len() < before {
            log::debug!("pruned {} expired session(s)", before - sessions.len());
        }
        sessions.insert(
            id,
            Entry {
                session,
                opened_at: now,
            },
        );

        format!(
            "{COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.ttl.as_secs()
        )
    }

    pub fn current(&self, headers: &HeaderMap) -> Option<Session> {
        let id = session_id(headers)?;
        self.read()
            .get(&id)
            .filter(|e| e.opened_at.elapsed() < self.ttl)
            .map(|e| e.session.clone())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.read().len()
    }

    /// Drops the session named by the request cookie, if any, and returns a
    /// `Set-Cookie` value that expires it.
    pub fn close(&self, headers: &HeaderMap) -> String {
        if let Some(id) = session_id(headers) {
            self.write().remove(&id);
        }
        format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, Entry>> {
        self.r.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Entry>> {
        self.r.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}
