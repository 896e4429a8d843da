//! Session storage seen by the payload builder.
//!
//! The tracker only needs a key/value view of the current visit's session.
//! [`MemorySessionStore`] and [`attach_session`] provide a process-local
//! implementation keyed by a session cookie; applications with their own
//! session layer can insert any [`Session`] as a [`SessionHandle`] extension.
//!
//! A new session is only stored, and its cookie only set, once something was
//! written to it. Stored sessions expire after an idle timeout and the store
//! evicts the least recently used one when it is full.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use beacon_core::{TrackingError, TrackingResult};
use cookie::Cookie;
use serde_json::Value;
use tracing::{debug, warn};

use crate::TrackingRequest;

pub const SESSION_COOKIE_NAME: &str = "beacon_sid";
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> TrackingResult<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> TrackingResult<()>;
}

/// Request extension exposing the current session to the tracker
#[derive(Clone)]
pub struct SessionHandle(pub Arc<dyn Session>);

impl std::ops::Deref for SessionHandle {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct MemorySession {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values
            .read()
            .map(|values| values.is_empty())
            .unwrap_or(false)
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> TrackingResult<Option<Value>> {
        let values = self
            .values
            .read()
            .map_err(|e| TrackingError::session(format!("Session lock poisoned: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> TrackingResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| TrackingError::session(format!("Session lock poisoned: {}", e)))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug)]
struct StoredSession {
    session: Arc<MemorySession>,
    last_seen: Instant,
}

/// Process-local sessions keyed by session id
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the session id, the session, and whether it is new.
    ///
    /// New sessions are not stored until [`MemorySessionStore::persist`].
    pub fn load_or_create(&self, session_id: Option<&str>) -> (String, Arc<MemorySession>, bool) {
        if let Some(id) = session_id {
            if let Some(session) = self.load(id) {
                return (id.to_string(), session, false);
            }
        }

        let id = beacon_core::generate_id().to_string();
        (id, Arc::new(MemorySession::new()), true)
    }

    /// Live session for `session_id`, refreshing its idle deadline
    pub fn load(&self, session_id: &str) -> Option<Arc<MemorySession>> {
        let now = Instant::now();
        let mut sessions = self.write();
        let expired = match sessions.get_mut(session_id) {
            Some(stored) if now.duration_since(stored.last_seen) < self.idle_timeout => {
                stored.last_seen = now;
                return Some(stored.session.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(session_id);
            debug!("Session {} expired", session_id);
        }
        None
    }

    /// Store a new session, making room by dropping expired then least recently used ones
    pub fn persist(&self, session_id: &str, session: Arc<MemorySession>) {
        let now = Instant::now();
        let mut sessions = self.write();

        if sessions.len() >= self.max_sessions {
            let idle_timeout = self.idle_timeout;
            sessions.retain(|_, stored| now.duration_since(stored.last_seen) < idle_timeout);
        }
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, stored)| stored.last_seen)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    debug!("Evicted session {}", id);
                }
                None => break,
            }
        }

        sessions.insert(
            session_id.to_string(),
            StoredSession {
                session,
                last_seen: now,
            },
        );
        debug!("Stored session {}", session_id);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned map is still structurally valid; keep serving it
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredSession>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredSession>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Attach a session to the request; new sessions that were written to are
/// stored and get a session cookie
pub async fn attach_session(
    State(store): State<Arc<MemorySessionStore>>,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = TrackingRequest::from_request(&req)
        .cookie(SESSION_COOKIE_NAME)
        .map(str::to_string);
    let (session_id, session, created) = store.load_or_create(existing.as_deref());
    req.extensions_mut().insert(SessionHandle(session.clone()));

    let mut response = next.run(req).await;

    if created && !session.is_empty() {
        store.persist(&session_id, session);
        let cookie = Cookie::build((SESSION_COOKIE_NAME, session_id))
            .path("/")
            .http_only(true)
            .build();
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("Failed to encode session cookie: {}", e),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_memory_session_get_set() {
        let session = MemorySession::new();
        assert_eq!(session.get("missing").unwrap(), None);
        assert!(session.is_empty());

        session.set("key", json!({"cs": "news"})).unwrap();
        assert_eq!(session.get("key").unwrap(), Some(json!({"cs": "news"})));
        assert!(!session.is_empty());
    }

    #[test]
    fn test_store_reuses_persisted_session() {
        let store = MemorySessionStore::new();
        let (id, session, created) = store.load_or_create(None);
        assert!(created);
        session.set("visited", json!(true)).unwrap();
        store.persist(&id, session);

        let (same_id, same_session, created) = store.load_or_create(Some(&id));
        assert!(!created);
        assert_eq!(same_id, id);
        assert_eq!(same_session.get("visited").unwrap(), Some(json!(true)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_replaces_unknown_session_id() {
        let store = MemorySessionStore::new();
        let (id, _, created) = store.load_or_create(Some("forged"));
        assert!(created);
        assert_ne!(id, "forged");
    }

    #[test]
    fn test_cookieless_requests_do_not_grow_store() {
        let store = MemorySessionStore::new();
        for _ in 0..10_000 {
            store.load_or_create(None);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_evicts_least_recently_used_when_full() {
        let store = MemorySessionStore::with_limits(Duration::from_secs(3600), 2);
        store.persist("a", Arc::new(MemorySession::new()));
        store.persist("b", Arc::new(MemorySession::new()));
        // Touch "a" so "b" is the oldest
        assert!(store.load("a").is_some());

        store.persist("c", Arc::new(MemorySession::new()));

        assert_eq!(store.len(), 2);
        assert!(store.load("a").is_some());
        assert!(store.load("b").is_none());
        assert!(store.load("c").is_some());
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = MemorySessionStore::with_limits(Duration::ZERO, 10);
        store.persist("a", Arc::new(MemorySession::new()));

        assert!(store.load("a").is_none());
        assert!(store.is_empty());

        let (id, _, created) = store.load_or_create(Some("a"));
        assert!(created);
        assert_ne!(id, "a");
    }

    fn app(store: Arc<MemorySessionStore>) -> Router {
        Router::new()
            .route("/", get(|| async { "plain" }))
            .route(
                "/remember",
                get(|req: Request| async move {
                    if let Some(session) = req.extensions().get::<SessionHandle>() {
                        let _ = session.set("remembered", json!(true));
                    }
                    "remembered"
                }),
            )
            .layer(from_fn_with_state(store, attach_session))
    }

    #[tokio::test]
    async fn test_session_cookie_only_for_written_sessions() {
        let store = Arc::new(MemorySessionStore::new());

        for _ in 0..50 {
            let response = app(store.clone())
                .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.headers().get(SET_COOKIE).is_none());
        }
        assert!(store.is_empty());

        let response = app(store.clone())
            .oneshot(axum::http::Request::builder().uri("/remember").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("beacon_sid="));
        assert_eq!(store.len(), 1);
    }
}
