//! Per-browser sessions
//!
//! Each browser gets a `hub_session` cookie holding a random UUID. The state
//! behind it sits in its own async mutex, so requests from one browser run
//! one at a time while different browsers never wait on each other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::remote::RemoteSession;
use crate::tools::WebsiteConversation;

pub const SESSION_COOKIE: &str = "hub_session";

/// Everything the dashboard remembers between requests from one browser
#[derive(Debug, Default)]
pub struct BrowserSession {
    /// Linux file-manager page
    pub linux: RemoteSession,
    /// Docker page; it keeps its own connection fields
    pub docker: RemoteSession,
    pub website: WebsiteConversation,
}

pub type SharedSession = Arc<Mutex<BrowserSession>>;

/// Sessions idle longer than this are dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bound on live sessions; the least recently seen goes first
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct Entry {
    session: SharedSession,
    last_seen: parking_lot::Mutex<Instant>,
}

impl Entry {
    fn idle_since(&self) -> Instant {
        *self.last_seen.lock()
    }
}

pub struct SessionStore {
    sessions: DashMap<String, Entry>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Look up the session for `cookie`, creating a fresh one when the cookie
    /// is missing, malformed, unknown or expired. Returns the id and whether
    /// it is new.
    pub fn resolve(&self, cookie: Option<&str>) -> (String, SharedSession, bool) {
        self.resolve_at(cookie, Instant::now())
    }

    fn resolve_at(&self, cookie: Option<&str>, now: Instant) -> (String, SharedSession, bool) {
        if let Some(id) = cookie.filter(|c| Uuid::parse_str(c).is_ok()) {
            if let Some(entry) = self.sessions.get(id) {
                let mut last_seen = entry.last_seen.lock();
                if now.saturating_duration_since(*last_seen) < self.idle_timeout {
                    *last_seen = now;
                    return (id.to_string(), entry.session.clone(), false);
                }
            }
        }

        self.evict_idle(now);
        while self.sessions.len() >= self.max_sessions {
            if !self.evict_oldest() {
                break;
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = SharedSession::default();
        self.sessions.insert(
            id.clone(),
            Entry {
                session: session.clone(),
                last_seen: parking_lot::Mutex::new(now),
            },
        );
        debug!("Created browser session {} ({} live)", id, self.sessions.len());
        (id, session, true)
    }

    /// Drop every session not seen within the idle timeout
    pub fn evict_idle(&self, now: Instant) {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.idle_since()) < self.idle_timeout);
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            debug!("Dropped {} idle browser session(s)", dropped);
        }
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().idle_since())
            .map(|entry| entry.key().clone());
        match oldest {
            Some(id) => self.sessions.remove(&id).is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
