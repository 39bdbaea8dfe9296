//! The process-wide session shared by clients built with `NessusClient::new`.
//!
//! Kept in its own test binary: nothing else in this process touches the
//! shared context.

use nessus_core::session::default_headers;
use nessus_core::{Headers, NessusClient};

#[test]
fn clients_share_one_header_set() {
    let first = NessusClient::new("https://127.0.0.1:8834").unwrap();
    first.set_headers(Headers::from([("test".to_string(), "test".to_string())]));

    let second = NessusClient::new("http://example.com").unwrap();
    assert_eq!(second.headers().get("test").map(String::as_str), Some("test"));

    second.set_headers(Headers::new());
    second.session().update(|headers| {
        headers.insert("test2".to_string(), "test2".to_string());
    });
    assert_eq!(
        first.headers(),
        Headers::from([("test2".to_string(), "test2".to_string())])
    );

    first.reset_headers();
    assert_eq!(second.headers(), default_headers());
    assert_eq!(second.headers().len(), 2);
}
