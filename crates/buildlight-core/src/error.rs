//! Error taxonomy for a status update cycle.
//!
//! Every variant is terminal for the cycle that produced it. Nothing here is
//! retried; the next update request is the recovery path.

/// Failures reading local version-control state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VcsError {
    #[error("failed to run git: {0}")]
    Spawn(String),

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("git {command} returned empty output")]
    EmptyOutput { command: String },
}

/// Errors reported to the presenter in place of a status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("Fetching Travis CI build status failed: Could not detect username and repository")]
    IdentityUnresolved,

    #[error("Travis could not find {slug}")]
    RepositoryNotFound { slug: String },

    #[error("Travis found your repository, but it never ran a test.")]
    NeverBuilt,

    #[error("Unsupported build state: {state:?}")]
    UnsupportedBuildState { state: String },

    #[error("Fetching Travis CI build status failed: {0}")]
    QueryFailure(String),

    #[error("Proxy address {address:?} could not be parsed ({reason}); connecting directly")]
    ProxyConfigurationInvalid { address: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl StatusError {
    /// Stable machine-readable name, used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StatusError::IdentityUnresolved => "identity_unresolved",
            StatusError::RepositoryNotFound { .. } => "repository_not_found",
            StatusError::NeverBuilt => "never_built",
            StatusError::UnsupportedBuildState { .. } => "unsupported_build_state",
            StatusError::QueryFailure(_) => "query_failure",
            StatusError::ProxyConfigurationInvalid { .. } => "proxy_configuration_invalid",
            StatusError::InvalidConfiguration(_) => "invalid_configuration",
        }
    }
}

/// Result type for a status update cycle.
pub type Result<T> = std::result::Result<T, StatusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_messages_per_cause() {
        let not_found = StatusError::RepositoryNotFound {
            slug: "octo/widgets".to_string(),
        }
        .to_string();
        let never = StatusError::NeverBuilt.to_string();
        let generic = StatusError::QueryFailure("connection reset".to_string()).to_string();

        assert_eq!(not_found, "Travis could not find octo/widgets");
        assert!(never.contains("never ran a test"));
        assert!(generic.contains("connection reset"));
        assert_ne!(not_found, never);
        assert_ne!(never, generic);
    }

    #[test]
    fn test_unsupported_state_names_state() {
        let err = StatusError::UnsupportedBuildState {
            state: "queued".to_string(),
        };
        assert!(err.to_string().contains("queued"));
        assert_eq!(err.kind(), "unsupported_build_state");
    }

    #[test]
    fn test_vcs_error_display() {
        let err = VcsError::CommandFailed {
            command: "rev-parse HEAD".to_string(),
            stderr: "not a git repository".to_string(),
        };
        assert!(err.to_string().contains("rev-parse HEAD"));
        assert!(err.to_string().contains("not a git repository"));
    }
}
