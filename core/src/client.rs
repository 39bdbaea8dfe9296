//! The request engine every endpoint facade goes through.
//!
//! # Design
//! Like a stateless request builder, each call is split into
//! `build_request` (pure: URL, headers, body) and `parse_response` (pure:
//! status and body decoding). `execute` glues them together around a
//! `Transport` and the retry policy. Only connectivity failures are retried;
//! every status code other than 200 comes back as `NessusError::StatusCode`
//! for the caller to interpret.
//!
//! Headers come from the client's `SessionContext`, which by default is the
//! process-wide one, so a login performed through any client is visible to
//! all of them.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::base_url::BaseUrl;
use crate::config::ClientConfig;
use crate::error::{NessusError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use crate::retry::RetryPolicy;
use crate::session::{Headers, SessionContext};
use crate::transport::UreqTransport;
use crate::types::Response;

/// Blocking client for the Nessus REST API.
#[derive(Clone)]
pub struct NessusClient {
    base_url: BaseUrl,
    session: Arc<SessionContext>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for NessusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NessusClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl NessusClient {
    /// Client with default settings on the process-wide session.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self::from_config(&ClientConfig::new(base_url)?))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            session: SessionContext::shared(),
            transport: Arc::new(UreqTransport::new(config.verify_tls, config.timeout())),
            retry: config.retry,
        }
    }

    /// Use `session` instead of the process-wide context.
    pub fn with_session(mut self, session: Arc<SessionContext>) -> Self {
        self.session = session;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn headers(&self) -> Headers {
        self.session.headers()
    }

    pub fn set_headers(&self, headers: Headers) {
        self.session.set_headers(headers);
    }

    pub fn reset_headers(&self) {
        self.session.reset();
    }

    pub fn get(&self, path: &str) -> Result<Response> {
        self.execute(HttpMethod::Get, path, &())
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.execute(HttpMethod::Post, path, body)
    }

    pub fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.execute(HttpMethod::Put, path, body)
    }

    pub fn delete(&self, path: &str) -> Result<Response> {
        self.execute(HttpMethod::Delete, path, &())
    }

    /// Issue a request with the session's current headers.
    pub fn execute<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<Response> {
        let headers = self.session.headers();
        self.execute_with_headers(method, path, body, &headers)
    }

    /// Issue a request with an explicit header set, leaving the session
    /// untouched.
    pub fn execute_with_headers<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
        headers: &Headers,
    ) -> Result<Response> {
        let request = self.build_request(method, path, body, headers)?;
        let response = self.retry.run(
            |attempt| {
                debug!(method = %request.method, url = %request.url, attempt, "sending request");
                self.transport
                    .execute(&request)
                    .map_err(|e| transport_error(&request, e))
            },
            NessusError::is_retryable,
        )?;
        self.parse_response(&request, response)
    }

    /// Describe a request without sending it. Null, `{}` and `[]` bodies are
    /// dropped so GET and DELETE go out without a payload.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
        headers: &Headers,
    ) -> Result<HttpRequest> {
        let body = serde_json::to_value(body)
            .map_err(|e| NessusError::Unexpected(format!("cannot serialize request body: {e}")))?;
        let body = if is_empty_body(&body) {
            None
        } else {
            Some(body.to_string())
        };

        Ok(HttpRequest {
            method,
            url: self.base_url.join(path),
            headers: headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            body,
        })
    }

    /// 200 decodes to JSON, falling back to raw text; anything else is a
    /// `StatusCode` error.
    pub fn parse_response(&self, request: &HttpRequest, response: HttpResponse) -> Result<Response> {
        debug!(method = %request.method, url = %request.url, status = response.status, "received response");
        if response.status != 200 {
            return Err(NessusError::StatusCode {
                method: request.method,
                uri: request.url.clone(),
                status_code: response.status,
                body: response.body,
            });
        }
        match serde_json::from_str(&response.body) {
            Ok(value) => Ok(Response::Json(value)),
            Err(_) => Ok(Response::Text(response.body)),
        }
    }
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn transport_error(request: &HttpRequest, err: TransportError) -> NessusError {
    let method = request.method;
    let uri = request.url.clone();
    match err {
        TransportError::Connect(reason) | TransportError::Timeout(reason) => {
            NessusError::Networking { method, uri, reason }
        }
        TransportError::Body(reason) => {
            NessusError::Unexpected(format!("{method} {uri}: cannot read response body: {reason}"))
        }
        TransportError::Other(reason) => NessusError::UnexpectedNetworking { method, uri, reason },
    }
}
