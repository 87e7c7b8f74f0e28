//! Process-local session store
//!
//! A session is identified by a random UUID carried in the `rowdesk_session`
//! cookie. Each record holds the login state and the flash messages waiting
//! to be shown. A record is only stored once there is something to keep (a
//! flash or a login), so cookieless traffic leaves the store untouched.
//! Authenticated records expire a fixed time after creation, anonymous ones
//! after at most [`ANONYMOUS_SESSION_TTL`]. Logging in replaces the record
//! with a fresh id so a pre-login cookie never becomes an authenticated one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::flash::Flash;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "rowdesk_session";

/// Upper bound on the lifetime of a record that is not logged in.
pub const ANONYMOUS_SESSION_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a cookie value. Anything that is not a UUID is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated {
        username: String,
    },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }
}

#[derive(Debug, Clone)]
struct SessionRecord {
    state: SessionState,
    flashes: Vec<Flash>,
    created_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new(state: SessionState) -> Self {
        Self {
            state,
            flashes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .is_some_and(|expiry| expiry <= now)
    }
}

/// Concurrent map of live sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<SessionId, SessionRecord>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Lifetime of a record in `state`.
    pub fn lifetime(&self, state: &SessionState) -> Duration {
        match state {
            SessionState::Anonymous => self.ttl.min(ANONYMOUS_SESSION_TTL),
            SessionState::Authenticated { .. } => self.ttl,
        }
    }

    fn is_live(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        !record.is_expired(self.lifetime(&record.state), now)
    }

    /// Return `presented` if it names a live session, otherwise hand out a
    /// new id. Nothing is stored for the new id until a flash or a login
    /// needs it. The flag is true when a new id was handed out.
    pub fn open(&self, presented: Option<SessionId>) -> (SessionId, bool) {
        if let Some(id) = presented {
            let now = Utc::now();
            let live = self
                .sessions
                .get(&id)
                .map(|record| self.is_live(&record, now));
            match live {
                Some(true) => return (id, false),
                Some(false) => {
                    self.sessions.remove(&id);
                    tracing::debug!(session = %id, "Session expired");
                }
                None => {}
            }
        }

        (SessionId::new(), true)
    }

    /// Current state of `id`. Unknown or expired ids are anonymous.
    pub fn state(&self, id: SessionId) -> SessionState {
        let now = Utc::now();
        self.sessions
            .get(&id)
            .filter(|record| self.is_live(record, now))
            .map(|record| record.state.clone())
            .unwrap_or_default()
    }

    pub fn is_authenticated(&self, id: SessionId) -> bool {
        self.state(id).is_authenticated()
    }

    /// Mark a successful login. The previous record is dropped and its
    /// pending flashes move to the returned id.
    pub fn login(&self, previous: Option<SessionId>, username: impl Into<String>) -> SessionId {
        let flashes = previous
            .and_then(|old| self.sessions.remove(&old))
            .map(|(_, record)| record.flashes)
            .unwrap_or_default();

        self.purge_expired();

        let id = SessionId::new();
        let mut record = SessionRecord::new(SessionState::Authenticated {
            username: username.into(),
        });
        record.flashes = flashes;
        self.sessions.insert(id, record);
        id
    }

    /// Return `id` to the anonymous state, keeping pending flashes. The
    /// anonymous lifetime starts now.
    pub fn logout(&self, id: SessionId) {
        if let Some(mut record) = self.sessions.get_mut(&id) {
            record.state = SessionState::Anonymous;
            record.created_at = Utc::now();
        }
    }

    /// Queue a flash for the next rendered page.
    pub fn push_flash(&self, id: SessionId, flash: Flash) {
        self.sessions
            .entry(id)
            .or_insert_with(|| SessionRecord::new(SessionState::Anonymous))
            .flashes
            .push(flash);
    }

    /// Remove and return the queued flashes.
    pub fn take_flashes(&self, id: SessionId) -> Vec<Flash> {
        self.sessions
            .get_mut(&id)
            .map(|mut record| std::mem::take(&mut record.flashes))
            .unwrap_or_default()
    }

    /// Drop expired sessions, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, record| self.is_live(record, now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// ============================================================================
// COOKIES
// ============================================================================

/// `Set-Cookie` value carrying `id`.
pub fn session_cookie(id: SessionId, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        id,
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Session id from the request's `Cookie` headers, if one parses.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name == SESSION_COOKIE {
                SessionId::parse(value)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(3600))
    }

    #[test]
    fn test_open_stores_nothing_until_needed() {
        let store = store();
        for _ in 0..100 {
            let (id, created) = store.open(None);
            assert!(created);
            assert_eq!(store.state(id), SessionState::Anonymous);
        }
        assert!(store.is_empty());

        let (id, _) = store.open(None);
        store.push_flash(id, Flash::info("hello"));
        assert_eq!(store.len(), 1);

        let (again, created) = store.open(Some(id));
        assert_eq!(again, id);
        assert!(!created);
    }

    #[test]
    fn test_unknown_id_gets_fresh_session() {
        let store = store();
        let stranger = SessionId::new();
        let (id, created) = store.open(Some(stranger));
        assert!(created);
        assert_ne!(id, stranger);
        assert!(store.is_empty());
    }

    #[test]
    fn test_anonymous_lifetime_is_capped() {
        let store = SessionStore::new(Duration::from_secs(86_400));
        assert_eq!(store.lifetime(&SessionState::Anonymous), ANONYMOUS_SESSION_TTL);
        let admin = SessionState::Authenticated {
            username: "admin".to_string(),
        };
        assert_eq!(store.lifetime(&admin), Duration::from_secs(86_400));

        let short = SessionStore::new(Duration::from_secs(5));
        assert_eq!(short.lifetime(&SessionState::Anonymous), Duration::from_secs(5));
    }

    #[test]
    fn test_login_rotates_id_and_keeps_flashes() {
        let store = store();
        let (anon, _) = store.open(None);
        store.push_flash(anon, Flash::info("hello"));

        let id = store.login(Some(anon), "admin");
        assert_ne!(id, anon);
        assert!(store.is_authenticated(id));
        assert!(!store.is_authenticated(anon));
        assert_eq!(store.take_flashes(id), vec![Flash::info("hello")]);
        assert!(store.take_flashes(id).is_empty());
    }

    #[test]
    fn test_logout_returns_to_anonymous() {
        let store = store();
        let id = store.login(None, "admin");
        store.logout(id);
        assert_eq!(store.state(id), SessionState::Anonymous);
    }

    #[test]
    fn test_expired_sessions_are_anonymous_and_purged() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.login(None, "admin");
        assert!(!store.is_authenticated(id));
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_cookie_round_trip() {
        let id = SessionId::new();
        let cookie = session_cookie(id, Duration::from_secs(60), true);
        assert!(cookie.starts_with("rowdesk_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.ends_with("; Secure"));

        let mut headers = HeaderMap::new();
        let value = format!("theme=dark; {}={}", SESSION_COOKIE, id);
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("")),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_garbage_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("rowdesk_session=not-a-uuid"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
    }
}
