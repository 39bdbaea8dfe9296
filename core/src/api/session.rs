use serde_json::json;
use tracing::info;

use crate::client::NessusClient;
use crate::error::{NessusError, Result};
use crate::types::{ApiKeys, EditSession, SessionInfo, SessionToken};

/// `/session` endpoints of the current user.
pub struct SessionApi<'a> {
    client: &'a NessusClient,
}

impl<'a> SessionApi<'a> {
    pub fn new(client: &'a NessusClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a session token. Does not touch the session
    /// headers; use `Authenticator` to log in.
    pub fn create(&self, username: &str, password: &str) -> Result<SessionToken> {
        self.client
            .post("/session", &json!({ "username": username, "password": password }))
            .map_err(|e| match e {
                NessusError::StatusCode { body, .. } => NessusError::Authentication(body),
                other => other,
            })?
            .decode()
    }

    /// Log out and reset the session headers.
    pub fn destroy(&self) -> Result<()> {
        match self.client.delete("/session") {
            Ok(_) => {
                self.client.reset_headers();
                info!("session destroyed");
                Ok(())
            }
            Err(NessusError::StatusCode { status_code: 401, .. }) => Err(NessusError::Authentication(
                "returned 401, no session exists".to_string(),
            )),
            Err(NessusError::Networking { reason, .. }) => Err(NessusError::Authentication(format!(
                "could not get a response: {reason}"
            ))),
            Err(NessusError::StatusCode {
                status_code, body, ..
            }) => Err(NessusError::Unexpected(format!(
                "logout returned HTTP {status_code}: {body}"
            ))),
            Err(other) => Err(other),
        }
    }

    pub fn get(&self) -> Result<SessionInfo> {
        self.client
            .get("/session")
            .map_err(|e| super::map_status(e, || "session".to_string()))?
            .decode()
    }

    /// Change the name and/or email of the current user.
    pub fn edit(&self, changes: &EditSession) -> Result<SessionInfo> {
        self.client
            .put("/session", changes)
            .map_err(|e| super::map_status(e, || "session".to_string()))?
            .decode()
    }

    pub fn password(&self, password: &str, current_password: &str) -> Result<()> {
        self.client
            .put(
                "/session/chpasswd",
                &json!({ "password": password, "current_password": current_password }),
            )
            .map_err(|e| super::map_status(e, || "password change".to_string()))?;
        Ok(())
    }

    /// Generate a new API key pair for the current user. Invalidates the
    /// previous pair.
    pub fn keys(&self) -> Result<ApiKeys> {
        self.client
            .put("/session/keys", &())
            .map_err(|e| super::map_status(e, || "API keys".to_string()))?
            .decode()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::tests::client;
    use crate::http::testing::ScriptedTransport;
    use crate::http::{HttpMethod, TransportError};
    use crate::session::{default_headers, Headers, X_COOKIE};

    #[test]
    fn create_returns_token() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, r#"{"token":"abc"}"#));
        let token = SessionApi::new(&client(&transport)).create("admin", "secret").unwrap();
        assert_eq!(token.token, "abc");
    }

    #[test]
    fn create_with_bad_password_is_authentication_error() {
        let transport = Arc::new(ScriptedTransport::new().respond(401, r#"{"error":"Invalid Credentials"}"#));
        let err = SessionApi::new(&client(&transport)).create("admin", "").unwrap_err();
        match err {
            NessusError::Authentication(body) => assert!(body.contains("Invalid Credentials")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn destroy_resets_headers() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, ""));
        let c = client(&transport);
        c.set_headers(Headers::from([(X_COOKIE.to_string(), "token=abc".to_string())]));
        SessionApi::new(&c).destroy().unwrap();
        assert_eq!(c.headers(), default_headers());
        assert_eq!(transport.requests()[0].method, HttpMethod::Delete);
        assert!(transport.requests()[0].body.is_none());
    }

    #[test]
    fn destroy_twice_fails_the_second_time() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, "").respond(401, ""));
        let c = client(&transport);
        let api = SessionApi::new(&c);
        api.destroy().unwrap();
        assert!(matches!(api.destroy().unwrap_err(), NessusError::Authentication(_)));
    }

    #[test]
    fn destroy_without_response_is_authentication_error() {
        let refused = || TransportError::Connect("connection refused".to_string());
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail(refused())
                .fail(refused())
                .fail(refused()),
        );
        let err = SessionApi::new(&client(&transport)).destroy().unwrap_err();
        assert!(matches!(err, NessusError::Authentication(_)));
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn destroy_with_server_error_is_unexpected() {
        let transport = Arc::new(ScriptedTransport::new().respond(500, "boom"));
        let err = SessionApi::new(&client(&transport)).destroy().unwrap_err();
        assert!(matches!(err, NessusError::Unexpected(_)));
    }

    #[test]
    fn keys_decodes_key_pair() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, r#"{"accessKey":"a","secretKey":"s"}"#));
        let keys = SessionApi::new(&client(&transport)).keys().unwrap();
        assert_eq!(keys.access_key, "a");
        assert_eq!(keys.secret_key, "s");
        assert!(transport.requests()[0].body.is_none());
    }

    #[test]
    fn edit_sends_only_given_fields() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(200, r#"{"id":1,"username":"admin","email":"a@b.c"}"#),
        );
        let info = SessionApi::new(&client(&transport))
            .edit(&EditSession {
                name: None,
                email: Some("a@b.c".to_string()),
            })
            .unwrap();
        assert_eq!(info.email.as_deref(), Some("a@b.c"));
        assert_eq!(transport.requests()[0].body.as_deref(), Some(r#"{"email":"a@b.c"}"#));
    }
}
