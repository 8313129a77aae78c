//! Client configuration

use hyper::Uri;
use std::env;
use std::time::Duration;

use crate::{ClientError, Result};

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";

/// Environment variable holding the API base URL
pub const ENV_BASE_URL: &str = "DFCACHE_URL";

/// Environment variable holding the request timeout in milliseconds
pub const ENV_TIMEOUT_MS: &str = "DFCACHE_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme, authority and optional path prefix, e.g. `http://proxy:8080/v1`
    pub base_url: String,
    /// Upper bound for a whole request/response exchange; `None` waits forever
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
            user_agent: concat!("dfcache-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Read `DFCACHE_URL` and `DFCACHE_TIMEOUT_MS` from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = ClientConfig::default();

        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Config(format!("{ENV_TIMEOUT_MS} must be milliseconds, got '{raw}'"))
            })?;
            config.request_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        Ok(config)
    }

    /// Base URL without trailing slashes, checked to be an absolute http URL
    pub(crate) fn normalized_base_url(&self) -> Result<String> {
        let base = self.base_url.trim_end_matches('/');
        let uri: Uri = base
            .parse()
            .map_err(|e| ClientError::Config(format!("Invalid URL '{base}': {e}")))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(ClientError::Config(format!(
                    "Unsupported scheme '{other}' in '{base}'"
                )))
            }
            None => return Err(ClientError::Config(format!("Missing scheme in '{base}'"))),
        }
        if uri.query().is_some() {
            return Err(ClientError::Config(format!(
                "Base URL must not carry a query: '{base}'"
            )));
        }

        Ok(base.to_string())
    }
}
