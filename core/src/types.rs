//! Response payloads and the DTOs exchanged with the endpoint facades.
//!
//! # Design
//! The request engine returns a loosely typed `Response`; facades decode it
//! into the structs below. Optional fields carry `#[serde(default)]` because
//! Nessus omits fields depending on license and role.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NessusError, Result};

/// Body of a 200 response: decoded JSON, or the raw text when the body is
/// not JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Json(Value),
    Text(String),
}

impl Response {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Response::Json(value) => Some(value),
            Response::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            Response::Json(_) => None,
        }
    }

    /// The body as text: raw text as-is, JSON re-serialized.
    pub fn into_text(self) -> String {
        match self {
            Response::Text(text) => text,
            Response::Json(value) => value.to_string(),
        }
    }

    /// Decode a JSON body into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Response::Json(value) => serde_json::from_value(value)
                .map_err(|e| NessusError::Unexpected(format!("malformed response: {e}"))),
            Response::Text(text) => Err(NessusError::Unexpected(format!(
                "expected a JSON response, got {} bytes of text",
                text.len()
            ))),
        }
    }
}

/// Returned by `POST /session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    #[serde(default)]
    pub md5sum_wizard_templates: Option<String>,
    #[serde(default)]
    pub md5sum_tenable_links: Option<String>,
}

/// Returned by `PUT /session/keys`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(rename = "accessKey")]
    pub access_key: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
}

impl ApiKeys {
    /// Value of the `X-ApiKeys` header.
    pub fn header_value(&self) -> String {
        format!("accessKey={};secretKey={}", self.access_key, self.secret_key)
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Returned by `GET /session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub permissions: u32,
    #[serde(default)]
    pub lastlogin: Option<i64>,
    #[serde(default)]
    pub container_id: Option<u64>,
    #[serde(default)]
    pub groups: Vec<Value>,
}

/// Body of `PUT /session`. Omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Returned by `GET /server/status`. `status` is one of `loading`, `ready`,
/// `corrupt-db`, `feed-expired`, `eval-expired`, `locked`, `register`,
/// `register-locked`, `download-failed`, `feed-error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    #[serde(default)]
    pub progress: Option<u32>,
}

impl ServerStatus {
    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

/// Body of `POST /server/restart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartOptions {
    pub reason: String,
    /// Restart only the web server, not the scanner service.
    pub soft: bool,
    /// Unlink from Tenable.io or Nessus Manager before restarting.
    pub unlink: bool,
    /// Wait until no scans are running.
    pub when_idle: bool,
}

impl Default for RestartOptions {
    fn default() -> Self {
        Self {
            reason: " ".to_string(),
            soft: false,
            unlink: false,
            when_idle: false,
        }
    }
}

/// One access-control entry on an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// `default`, `user` or `group`.
    #[serde(rename = "type")]
    pub kind: String,
    pub permissions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<u64>,
}

/// Returned by `GET /settings/network/mail`, sent by `PUT` to the same path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_from: String,
    pub smtp_www_host: String,
    pub smtp_auth: String,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub smtp_enc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<u64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub shared: Option<u32>,
    #[serde(default)]
    pub user_permissions: Option<u32>,
    #[serde(default)]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub last_modification_date: Option<i64>,
    #[serde(default)]
    pub agents_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentGroupList {
    #[serde(default)]
    pub groups: Vec<AgentGroup>,
}

/// `{"ids": [...]}` body of the bulk endpoints. A set keeps ids unique; it
/// serializes as a plain JSON array.
#[derive(Debug, Serialize)]
pub(crate) struct BulkIds<'a> {
    pub ids: &'a BTreeSet<u64>,
}
