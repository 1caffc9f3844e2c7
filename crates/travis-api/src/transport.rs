//! HTTP transport construction
//!
//! The proxy is resolved once, when the client is built. Environment proxy
//! variables are read explicitly rather than through reqwest's implicit
//! lookup so that an unusable address can be reported to the user.

use crate::error::TravisError;
use crate::Result;
use std::time::Duration;
use tracing::debug;

/// Proxy variables, in lookup order.
pub const PROXY_ENV_VARS: &[&str] = &["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"];

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Options for the underlying HTTP client
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Proxy address (`http://host:port`, or bare `host:port`)
    pub proxy: Option<String>,
    /// Timeout applied to every request
    pub timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions {
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("buildlight/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportOptions {
    /// Defaults plus the first non-empty proxy variable from the environment.
    pub fn from_env() -> Self {
        TransportOptions {
            proxy: proxy_from_env(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drop the proxy and connect directly.
    pub fn without_proxy(mut self) -> Self {
        self.proxy = None;
        self
    }
}

/// First non-empty proxy variable, if any.
pub fn proxy_from_env() -> Option<String> {
    PROXY_ENV_VARS
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Build a reqwest client for the given options.
///
/// Fails with [`TravisError::InvalidProxy`] when the proxy address cannot be
/// parsed.
pub fn build_http_client(options: &TransportOptions) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&options.user_agent)
        .timeout(options.timeout)
        .no_proxy();

    if let Some(address) = &options.proxy {
        let proxy = reqwest::Proxy::all(address.as_str()).map_err(|e| TravisError::InvalidProxy {
            address: address.clone(),
            reason: e.to_string(),
        })?;
        debug!(proxy = %address, "using proxy for Travis API requests");
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| TravisError::Http(format!("failed to create HTTP client: {e}")))
}
