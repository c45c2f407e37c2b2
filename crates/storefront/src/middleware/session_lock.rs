//! Per-session request serialization.
//!
//! Handlers load the checkout wizard from the session, change it, and store
//! it back; the session layer then writes the record when the response goes
//! out. Two requests for the same session must not interleave inside that
//! window, or the later write silently replaces the earlier one (a second
//! "Place order" click would start a second submission). This layer holds a
//! per-session lock for the whole request, around the session layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::COOKIE},
    middleware::Next,
    response::Response,
};
use tokio::sync::OwnedMutexGuard;
use tower_sessions::cookie::Cookie;

use super::session::SESSION_COOKIE_NAME;

type Entry = Arc<tokio::sync::Mutex<()>>;

/// One async lock per session id, created on demand.
#[derive(Clone, Default)]
pub struct SessionLocks {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl SessionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session.
    pub async fn acquire(&self, session_id: &str) -> SessionLockGuard {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(session_id.to_owned()).or_default())
        };

        SessionLockGuard {
            session_id: session_id.to_owned(),
            locks: self.clone(),
            _guard: entry.lock_owned().await,
        }
    }

    /// Number of sessions with a held or awaited lock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one session until dropped.
pub struct SessionLockGuard {
    session_id: String,
    locks: SessionLocks,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        let mut entries = self
            .locks
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // The map and this guard hold one reference each; any more are waiters.
        let idle = entries
            .get(&self.session_id)
            .is_some_and(|entry| Arc::strong_count(entry) <= 2);
        if idle {
            entries.remove(&self.session_id);
        }
    }
}

/// Session id from the request's session cookie, if any.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
}

/// Middleware that runs one request at a time per session.
///
/// Requests without a session cookie start a new session and run unlocked.
pub async fn session_lock_middleware(
    State(locks): State<SessionLocks>,
    request: Request,
    next: Next,
) -> Response {
    let Some(session_id) = session_cookie(request.headers()) else {
        return next.run(request).await;
    };

    let _guard = locks.acquire(&session_id).await;
    next.run(request).await
}
