//! Blocking client for the Nessus vulnerability scanner's REST API.
//!
//! # Overview
//! `NessusClient` is the request engine: it validates the base URL, sends
//! JSON requests with the session's headers, retries connection failures
//! with exponential backoff, and returns every non-200 status as
//! `NessusError::StatusCode`. `Authenticator` logs in with a
//! username/password or an API key pair and installs the resulting headers.
//! The facades in [`api`] map individual endpoints and their status codes to
//! domain errors.
//!
//! # Design
//! - One authenticated session per process: clients share
//!   `SessionContext::shared()` unless given their own context.
//! - A handshake stages its headers and commits them only on success.
//! - `Transport` separates the engine from `ureq`, so retry and status
//!   handling are testable without a server.

pub mod api;
pub mod auth;
pub mod base_url;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod nessus;
pub mod retry;
pub mod session;
pub mod transport;
pub mod types;

pub use auth::{AuthOptions, AuthOutcome, Authenticator, Credentials};
pub use base_url::BaseUrl;
pub use client::NessusClient;
pub use config::ClientConfig;
pub use error::{NessusError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use nessus::Nessus;
pub use retry::RetryPolicy;
pub use session::{Headers, SessionContext};
pub use transport::UreqTransport;
pub use types::Response;
