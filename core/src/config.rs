//! Client configuration.
//!
//! A `ClientConfig` is built in code or loaded from the environment:
//!
//! | variable              | field          | default |
//! |-----------------------|----------------|---------|
//! | `NESSUS_URL`          | `base_url`     | required |
//! | `NESSUS_VERIFY_TLS`   | `verify_tls`   | `false` |
//! | `NESSUS_TIMEOUT_SECS` | `timeout_ms`   | `10`    |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::base_url::BaseUrl;
use crate::error::{NessusError, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: BaseUrl,
    /// Verify the server's TLS certificate. Nessus ships with a self-signed
    /// one, hence off by default.
    #[serde(default)]
    pub verify_tls: bool,
    /// Bound on a single request attempt. Never zero.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: BaseUrl::parse(base_url)?,
            verify_tls: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Sub-millisecond remainders round up; a zero timeout is rejected.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(NessusError::Config("timeout must be greater than zero".to_string()));
        }
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("NESSUS_URL")
            .ok_or_else(|| NessusError::Config("NESSUS_URL is not set".to_string()))?;
        let mut config = Self::new(&base_url)?;

        if let Some(raw) = lookup("NESSUS_VERIFY_TLS") {
            config.verify_tls = parse_bool(&raw).ok_or_else(|| {
                NessusError::Config(format!("NESSUS_VERIFY_TLS must be a boolean, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup("NESSUS_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                NessusError::Config(format!("NESSUS_TIMEOUT_SECS must be an integer, got {raw:?}"))
            })?;
            if secs == 0 {
                return Err(NessusError::Config(
                    "NESSUS_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
            config.timeout_ms = secs.saturating_mul(1000);
        }
        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
