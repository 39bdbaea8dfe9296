//! Failure paths that need a real socket: unreachable hosts, slow servers
//! and invalid base URLs.

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nessus_core::{
    ClientConfig, HttpMethod, NessusClient, NessusError, RetryPolicy, SessionContext,
};
use serde_json::json;

fn isolated(config: &ClientConfig) -> NessusClient {
    NessusClient::from_config(config).with_session(Arc::new(SessionContext::new()))
}

/// A local port with nothing listening on it.
fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn invalid_base_urls_are_rejected() {
    for raw in ["localhost", "127.0.0.1:8834", "https://", "ftp://example.com", ""] {
        match NessusClient::new(raw).unwrap_err() {
            NessusError::Validation { value, expected } => {
                assert_eq!(value, raw);
                assert_eq!(expected, "URL");
            }
            other => panic!("{raw:?}: unexpected error {other}"),
        }
    }
}

#[test]
fn unreachable_host_is_a_networking_error_for_every_method() {
    let config = ClientConfig::new(&closed_port_url())
        .unwrap()
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    let client = isolated(&config);

    let started = Instant::now();
    let results = [
        (HttpMethod::Get, client.get("/session")),
        (HttpMethod::Post, client.post("/session", &json!({ "username": "admin" }))),
        (HttpMethod::Put, client.put("/session", &json!({ "name": "x" }))),
        (HttpMethod::Delete, client.delete("/session")),
    ];
    for (expected_method, result) in results {
        match result.unwrap_err() {
            NessusError::Networking { method, uri, .. } => {
                assert_eq!(method, expected_method);
                assert!(uri.ends_with("/session"), "{uri}");
            }
            other => panic!("{expected_method}: unexpected error {other}"),
        }
    }
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn unresponsive_server_times_out_after_every_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    std::thread::spawn(move || {
        // Hold every connection open without answering.
        let mut open = Vec::new();
        for stream in listener.incoming() {
            counter.fetch_add(1, Ordering::SeqCst);
            open.push(stream);
        }
    });

    let timeout = Duration::from_millis(200);
    let config = ClientConfig::new(&format!("http://{addr}"))
        .unwrap()
        .with_timeout(timeout)
        .unwrap()
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    assert_eq!(config.timeout(), timeout);

    let started = Instant::now();
    let err = isolated(&config).get("/server/status").unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, NessusError::Networking { .. }), "{err}");
    assert!(err.is_retryable());
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
    // Each attempt waits out the full timeout; the backoff adds 10 ms + 20 ms.
    assert!(elapsed >= timeout * 3, "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
}

#[test]
fn zero_retry_policy_makes_one_attempt() {
    let config = ClientConfig::new(&closed_port_url())
        .unwrap()
        .with_retry(RetryPolicy::none());
    let started = Instant::now();
    let err = isolated(&config).get("/server/status").unwrap_err();
    assert!(matches!(err, NessusError::Networking { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}
