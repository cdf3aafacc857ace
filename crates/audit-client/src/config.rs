use std::fmt;
use std::time::Duration;

/// Default Arweave gateway used for published roots.
pub const DEFAULT_ARWEAVE_URL: &str = "https://arweave.net";

/// Configuration for the HTTP transport.
#[derive(Clone)]
pub struct ClientConfig {
    /// Service base URL, e.g. `https://audit.example.com`.
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total time spent polling an accepted request before giving up.
    pub poll_result_timeout: Duration,
    /// Upper bound on the delay between polls.
    pub max_poll_interval: Duration,
    /// User agent header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration for `base_url` with defaults for everything else.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            token: String::new(),
            timeout: Duration::from_secs(30),
            poll_result_timeout: Duration::from_secs(120),
            max_poll_interval: Duration::from_secs(10),
            user_agent: format!("audit-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("poll_result_timeout", &self.poll_result_timeout)
            .field("max_poll_interval", &self.max_poll_interval)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_token() {
        let config = ClientConfig::new("https://audit.example.com", "secret-token");
        let debug = format!("{config:?}");
        assert!(debug.contains("audit.example.com"));
        assert!(!debug.contains("secret-token"));
    }
}
