//! Error types for travis-api

use thiserror::Error;

/// Errors that can occur when talking to the Travis API
#[derive(Error, Debug)]
pub enum TravisError {
    /// The requested repository or branch does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API answered with an unexpected status code
    #[error("Travis API returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body did not match the expected shape
    #[error("Failed to decode Travis response: {0}")]
    Decode(String),

    /// Exchanging GitHub credentials for a Travis token failed
    #[error("Travis authentication failed: {0}")]
    Auth(String),

    /// A proxy address taken from the environment could not be parsed
    #[error("Invalid proxy address {address:?}: {reason}")]
    InvalidProxy { address: String, reason: String },

    /// A configured API base is not a usable URL
    #[error("Invalid API base URL {0:?}")]
    InvalidBaseUrl(String),
}

impl TravisError {
    /// Whether this error means the remote resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TravisError::NotFound(_))
            || matches!(self, TravisError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for TravisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TravisError::Decode(err.to_string())
        } else {
            TravisError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TravisError {
    fn from(err: serde_json::Error) -> Self {
        TravisError::Decode(err.to_string())
    }
}
