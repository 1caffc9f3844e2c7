//! Credential model
//!
//! Credentials are looked up through a [`CredentialSource`] on every query
//! so that edits to the underlying configuration take effect without
//! rebuilding the client.

use async_trait::async_trait;
use std::fmt;

/// Authentication to present to the Travis API
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Anonymous access (public repositories only)
    #[default]
    None,
    /// GitHub OAuth token, exchanged for a Travis access token
    GithubToken(String),
    /// GitHub username and password sent as HTTP basic auth
    Basic { username: String, password: String },
}

impl Credentials {
    /// Build credentials from optional raw values.
    ///
    /// A non-empty token wins over username/password; username and password
    /// are only used when both are non-empty.
    pub fn from_parts(token: Option<&str>, username: Option<&str>, password: Option<&str>) -> Self {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(token) = non_empty(token) {
            return Credentials::GithubToken(token);
        }
        match (non_empty(username), non_empty(password)) {
            (Some(username), Some(password)) => Credentials::Basic { username, password },
            _ => Credentials::None,
        }
    }
}

// Never print secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => write!(f, "Credentials::None"),
            Credentials::GithubToken(_) => write!(f, "Credentials::GithubToken(***)"),
            Credentials::Basic { username, .. } => {
                write!(f, "Credentials::Basic {{ username: {username:?}, password: *** }}")
            }
        }
    }
}

/// Supplies the credentials to use for the next query.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self) -> Credentials;
}

/// Fixed credentials.
#[async_trait]
impl CredentialSource for Credentials {
    async fn credentials(&self) -> Credentials {
        self.clone()
    }
}
