//! Header/session state shared by every client in the process.
//!
//! # Design
//! Nessus scopes authentication to the caller, not to a logical actor, so the
//! crate models one authenticated session per process: `SessionContext::shared`
//! hands out the same context to every client that does not bring its own.
//! Concurrent use under different credentials is not supported. Build a
//! separate context with `SessionContext::new` when isolation is required
//! (tests, multiple servers).
//!
//! Header values are always replaced wholesale; readers get a snapshot and
//! never observe a half-applied update.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard, RwLock};

/// Header name to value.
pub type Headers = BTreeMap<String, String>;

pub const CONTENT_TYPE: &str = "Content-type";
pub const ACCEPT: &str = "Accept";
pub const X_COOKIE: &str = "X-Cookie";
pub const X_API_KEYS: &str = "X-ApiKeys";
pub const X_API_TOKEN: &str = "X-Api-Token";

const APPLICATION_JSON: &str = "application/json";

static SHARED: OnceLock<Arc<SessionContext>> = OnceLock::new();

/// The headers a fresh or logged-out session sends.
pub fn default_headers() -> Headers {
    Headers::from([
        (CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()),
        (ACCEPT.to_string(), APPLICATION_JSON.to_string()),
    ])
}

#[derive(Debug)]
pub struct SessionContext {
    headers: RwLock<Headers>,
    handshake: Mutex<()>,
}

impl SessionContext {
    /// A new, isolated context holding the default headers.
    pub fn new() -> Self {
        Self {
            headers: RwLock::new(default_headers()),
            handshake: Mutex::new(()),
        }
    }

    /// The process-wide context.
    pub fn shared() -> Arc<Self> {
        SHARED.get_or_init(|| Arc::new(Self::new())).clone()
    }

    pub fn headers(&self) -> Headers {
        self.headers.read().clone()
    }

    /// Replace the whole header set.
    pub fn set_headers(&self, headers: Headers) {
        *self.headers.write() = headers;
    }

    /// Read-modify-write under the write lock. `apply` works on a copy that
    /// is committed only once it returns.
    pub fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut Headers),
    {
        let mut guard = self.headers.write();
        let mut staged = guard.clone();
        apply(&mut staged);
        *guard = staged;
    }

    /// Back to exactly `Content-type` and `Accept`.
    pub fn reset(&self) {
        self.set_headers(default_headers());
    }

    pub fn is_authenticated(&self) -> bool {
        let headers = self.headers.read();
        headers.contains_key(X_COOKIE) || headers.contains_key(X_API_KEYS)
    }

    /// Held for the duration of an authentication handshake.
    pub(crate) fn lock_handshake(&self) -> MutexGuard<'_, ()> {
        self.handshake.lock()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_starts_with_defaults() {
        let session = SessionContext::new();
        assert_eq!(session.headers(), default_headers());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn reset_restores_exactly_two_entries() {
        let session = SessionContext::new();
        session.set_headers(Headers::from([
            ("test".to_string(), "test".to_string()),
            (X_COOKIE.to_string(), "token=abc".to_string()),
        ]));
        session.reset();

        let headers = session.headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Content-type").map(String::as_str), Some("application/json"));
        assert_eq!(headers.get("Accept").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn set_replaces_the_whole_store() {
        let session = SessionContext::new();
        session.set_headers(Headers::from([("test".to_string(), "test".to_string())]));
        assert_eq!(
            session.headers(),
            Headers::from([("test".to_string(), "test".to_string())])
        );
    }

    #[test]
    fn update_merges_into_current_headers() {
        let session = SessionContext::new();
        session.update(|headers| {
            headers.insert(X_COOKIE.to_string(), "token=abc".to_string());
        });
        let headers = session.headers();
        assert_eq!(headers.len(), 3);
        assert!(session.is_authenticated());
    }

    #[test]
    fn shared_context_is_one_instance() {
        let a = SessionContext::shared();
        let b = SessionContext::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn snapshots_are_detached_from_the_store() {
        let session = SessionContext::new();
        let mut snapshot = session.headers();
        snapshot.insert("X-Extra".to_string(), "1".to_string());
        assert_eq!(session.headers(), default_headers());
    }
}
