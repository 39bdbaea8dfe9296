//! Authentication handshake.
//!
//! # Design
//! A handshake runs against a staged copy of the session headers. Every
//! request it makes (token exchange, key generation, API-token lookup,
//! verification) carries the staged headers explicitly. Only after every
//! step has succeeded are the staged auth headers written into the live
//! session, under its write lock; other headers set meanwhile are kept. A
//! failed handshake leaves the session exactly as it was.
//!
//! Handshakes on the same `SessionContext` are serialized by its handshake
//! lock.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;
use tracing::{debug, info};

use crate::client::NessusClient;
use crate::error::{NessusError, Result};
use crate::http::HttpMethod;
use crate::session::{Headers, X_API_KEYS, X_API_TOKEN, X_COOKIE};
use crate::types::{ApiKeys, SessionToken};

/// Script served by the web UI that embeds the UI's own API token.
pub const API_TOKEN_SCRIPT: &str = "/nessus6.js";

/// Headers that carry an identity; a handshake owns exactly these.
const AUTH_HEADERS: [&str; 3] = [X_COOKIE, X_API_KEYS, X_API_TOKEN];

static API_TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-f0-9]{8}-?[a-f0-9]{4}-?4[a-f0-9]{3}-?[89ab][a-f0-9]{3}-?[a-f0-9]{12}")
        .expect("API token pattern is valid")
});

/// How to log in. Username/password exchanges for a session token and a
/// freshly generated key pair; an existing key pair is installed as-is.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    UserPass { username: String, password: String },
    ApiKeys { access_key: String, secret_key: String },
}

impl Credentials {
    pub fn user_pass(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::UserPass {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn api_keys(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Credentials::ApiKeys {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Pick a flow from optional parts; username/password wins when both are
    /// given, and giving neither is an authentication error.
    pub fn from_parts(
        user_pass: Option<(String, String)>,
        api_keys: Option<(String, String)>,
    ) -> Result<Self> {
        match (user_pass, api_keys) {
            (Some((username, password)), _) => Ok(Self::user_pass(username, password)),
            (None, Some((access_key, secret_key))) => Ok(Self::api_keys(access_key, secret_key)),
            (None, None) => Err(NessusError::Authentication(
                "no credentials given: need a username/password or an API key pair".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::UserPass { username, .. } => f
                .debug_struct("UserPass")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::ApiKeys { access_key, .. } => f
                .debug_struct("ApiKeys")
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOptions {
    /// Fetch the web UI's API token and send it as `X-Api-Token`, lifting
    /// the API restriction of Nessus Professional. Best effort.
    pub bypass_api_limitations: bool,
    /// Confirm the new headers with `GET /session` before committing them.
    pub verify: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            bypass_api_limitations: true,
            verify: true,
        }
    }
}

/// What a successful handshake installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Session token, for the username/password flow.
    pub token: Option<String>,
    /// API token found in the UI script, if the bypass ran and found one.
    pub api_token: Option<String>,
}

pub struct Authenticator<'a> {
    client: &'a NessusClient,
}

impl<'a> Authenticator<'a> {
    pub fn new(client: &'a NessusClient) -> Self {
        Self { client }
    }

    /// Log in and install the resulting headers on the client's session.
    pub fn authenticate(&self, credentials: &Credentials, options: AuthOptions) -> Result<AuthOutcome> {
        let session = self.client.session();
        let _handshake = session.lock_handshake();

        // A new login replaces whatever identity the session carried.
        let mut staged = session.headers();
        for name in AUTH_HEADERS {
            staged.remove(name);
        }

        let mut outcome = AuthOutcome::default();
        match credentials {
            Credentials::UserPass { username, password } => {
                let token = self.create_session(username, password, &staged)?;
                staged.insert(X_COOKIE.to_string(), format!("token={token}"));
                let keys = self.generate_keys(&staged)?;
                staged.insert(X_API_KEYS.to_string(), keys.header_value());
                outcome.token = Some(token);
            }
            Credentials::ApiKeys {
                access_key,
                secret_key,
            } => {
                if access_key.is_empty() || secret_key.is_empty() {
                    return Err(NessusError::Authentication(
                        "access key and secret key must not be empty".to_string(),
                    ));
                }
                let keys = ApiKeys {
                    access_key: access_key.clone(),
                    secret_key: secret_key.clone(),
                };
                staged.insert(X_API_KEYS.to_string(), keys.header_value());
            }
        }

        if options.bypass_api_limitations {
            match self.fetch_api_token(&staged) {
                Ok(api_token) => {
                    staged.insert(X_API_TOKEN.to_string(), api_token.clone());
                    outcome.api_token = Some(api_token);
                }
                Err(e) => debug!(error = %e, "API token bypass skipped"),
            }
        }

        if options.verify {
            self.client
                .execute_with_headers(HttpMethod::Get, "/session", &(), &staged)
                .map_err(|e| NessusError::Authentication(format!("session verification failed: {e}")))?;
        }

        session.update(|headers| {
            for name in AUTH_HEADERS {
                match staged.remove(name) {
                    Some(value) => headers.insert(name.to_string(), value),
                    None => headers.remove(name),
                };
            }
        });
        info!(base_url = %self.client.base_url(), "authenticated");
        Ok(outcome)
    }

    /// `POST /session`; returns the session token.
    fn create_session(&self, username: &str, password: &str, headers: &Headers) -> Result<String> {
        if username.is_empty() || password.is_empty() {
            return Err(NessusError::Authentication(
                "username and password must not be empty".to_string(),
            ));
        }
        let body = json!({ "username": username, "password": password });
        let token: SessionToken = self
            .client
            .execute_with_headers(HttpMethod::Post, "/session", &body, headers)
            .map_err(auth_error)?
            .decode()
            .map_err(|e| NessusError::Authentication(format!("no session token in response: {e}")))?;
        if token.token.is_empty() {
            return Err(NessusError::Authentication("server returned an empty session token".to_string()));
        }
        Ok(token.token)
    }

    /// `PUT /session/keys`; generates a key pair for the session's user.
    fn generate_keys(&self, headers: &Headers) -> Result<ApiKeys> {
        self.client
            .execute_with_headers(HttpMethod::Put, "/session/keys", &(), headers)
            .map_err(auth_error)?
            .decode()
            .map_err(|e| NessusError::Authentication(format!("no API keys in response: {e}")))
    }

    /// Fetch the UI script and pull the embedded API token out of it.
    pub fn fetch_api_token(&self, headers: &Headers) -> Result<String> {
        let script = self
            .client
            .execute_with_headers(HttpMethod::Get, API_TOKEN_SCRIPT, &(), headers)?
            .into_text();
        extract_api_token(&script).ok_or_else(|| {
            NessusError::Unexpected(format!("no API token found in {API_TOKEN_SCRIPT}"))
        })
    }
}

/// First UUID-shaped (version 4) token in `text`.
pub fn extract_api_token(text: &str) -> Option<String> {
    API_TOKEN_PATTERN
        .find(text)
        .map(|found| found.as_str().to_string())
}

fn auth_error(err: NessusError) -> NessusError {
    match err {
        NessusError::StatusCode { body, .. } => NessusError::Authentication(body),
        other => other,
    }
}
