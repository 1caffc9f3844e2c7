//! Remote build records and the client seam.
//!
//! [`BuildStatusClient`] is what the reconciler talks to. The production
//! implementation adapts [`travis_api::TravisClient`]; tests use the fakes in
//! [`crate::fakes`].

use crate::identity::RepositoryIdentity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use travis_api::{BranchResponse, RepoResponse, TravisClient, TravisError};

/// Build state as reported by the API. Parsing is total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildState {
    Passed,
    Running,
    Failed,
    Errored,
    /// Anything else (`queued`, `created`, `canceled`, ...), or `""` for null
    Unknown(String),
}

impl BuildState {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("passed") => BuildState::Passed,
            Some("running") => BuildState::Running,
            Some("failed") => BuildState::Failed,
            Some("errored") => BuildState::Errored,
            Some(other) => BuildState::Unknown(other.to_string()),
            None => BuildState::Unknown(String::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BuildState::Passed => "passed",
            BuildState::Running => "running",
            BuildState::Failed => "failed",
            BuildState::Errored => "errored",
            BuildState::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub state: BuildState,
    /// `None` when the repository never built
    pub build_number: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
    /// Only present on branch-scoped records
    pub commit_id: Option<String>,
}

impl BuildRecord {
    /// Branch-scoped record from a branch response. `None` if the response
    /// carries no branch object.
    pub fn from_branch_response(response: BranchResponse) -> Option<Self> {
        let branch = response.branch?;
        Some(BuildRecord {
            state: BuildState::parse(branch.state.as_deref()),
            build_number: branch.number,
            started_at: branch.started_at,
            duration_seconds: branch.duration.unwrap_or(0),
            commit_id: response.commit.and_then(|c| c.sha),
        })
    }

    /// Repository-level record from a repository response. `None` if the
    /// response carries no repo object.
    pub fn from_repo_response(response: RepoResponse) -> Option<Self> {
        let repo = response.repo?;
        Some(BuildRecord {
            state: BuildState::parse(repo.last_build_state.as_deref()),
            build_number: repo.last_build_number,
            started_at: repo.last_build_started_at,
            duration_seconds: repo.last_build_duration.unwrap_or(0),
            commit_id: None,
        })
    }
}

/// Failure of a remote query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The repository or branch does not exist, or the response was empty
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Failed(String),
}

impl From<TravisError> for RemoteError {
    fn from(err: TravisError) -> Self {
        if err.is_not_found() {
            RemoteError::NotFound
        } else {
            RemoteError::Failed(err.to_string())
        }
    }
}

/// Read-only access to build records.
#[async_trait]
pub trait BuildStatusClient: Send + Sync {
    /// Latest build on `branch`.
    async fn branch_build(
        &self,
        repo: &RepositoryIdentity,
        branch: &str,
    ) -> Result<BuildRecord, RemoteError>;

    /// Most recent build of the repository as a whole.
    async fn last_build(&self, repo: &RepositoryIdentity) -> Result<BuildRecord, RemoteError>;
}

#[async_trait]
impl BuildStatusClient for TravisClient {
    async fn branch_build(
        &self,
        repo: &RepositoryIdentity,
        branch: &str,
    ) -> Result<BuildRecord, RemoteError> {
        let response = self.branch(&repo.owner, &repo.name, branch).await?;
        BuildRecord::from_branch_response(response).ok_or(RemoteError::NotFound)
    }

    async fn last_build(&self, repo: &RepositoryIdentity) -> Result<BuildRecord, RemoteError> {
        let response = self.repository(&repo.owner, &repo.name).await?;
        BuildRecord::from_repo_response(response).ok_or(RemoteError::NotFound)
    }
}
