//! Outbound HTTP client
//!
//! Every call to an external service goes through a client built here so
//! that none of them can block a request indefinitely.

use std::time::Duration;

/// Default bound on a single outbound call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound client settings
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout (connect + send + body)
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("platform/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout.min(Duration::from_secs(5)),
            ..Default::default()
        }
    }

    /// Build a `reqwest::Client`
    pub fn build(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .build()
    }
}

/// Whether a transport error means "upstream unreachable" rather than
/// "upstream answered with something we did not like"
///
/// Nothing is retried automatically. Callers surface these as
/// service-unavailable so the client can decide on backoff.
pub fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
