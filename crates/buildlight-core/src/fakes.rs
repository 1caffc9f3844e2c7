//! In-memory fakes for the two collaborator traits (testing only)
//!
//! `FakeVcs` answers branch/commit queries from fixed values.
//! `FakeBuildStatusClient` answers build queries from scripted records keyed
//! by `owner/name` (and branch), counts calls, and can delay or hang.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::VcsError;
use crate::identity::RepositoryIdentity;
use crate::remote::{BuildRecord, BuildStatusClient, RemoteError};
use crate::vcs::VcsStateReader;

// ---------------------------------------------------------------------------
// FakeVcs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeVcs {
    branch: String,
    commit: String,
    fail_branch: bool,
    fail_commit: bool,
}

impl FakeVcs {
    pub fn new(branch: &str, commit: &str) -> Self {
        FakeVcs {
            branch: branch.to_string(),
            commit: commit.to_string(),
            fail_branch: false,
            fail_commit: false,
        }
    }

    pub fn failing_branch(mut self) -> Self {
        self.fail_branch = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }
}

#[async_trait]
impl VcsStateReader for FakeVcs {
    async fn current_branch(&self, _workspace_root: &Path) -> Result<String, VcsError> {
        if self.fail_branch {
            return Err(VcsError::CommandFailed {
                command: "rev-parse --abbrev-ref HEAD".to_string(),
                stderr: "fatal: not a git repository".to_string(),
            });
        }
        Ok(self.branch.clone())
    }

    async fn current_commit(&self, _workspace_root: &Path) -> Result<String, VcsError> {
        if self.fail_commit {
            return Err(VcsError::CommandFailed {
                command: "rev-parse HEAD".to_string(),
                stderr: "fatal: ambiguous argument 'HEAD'".to_string(),
            });
        }
        Ok(self.commit.clone())
    }
}

// ---------------------------------------------------------------------------
// FakeBuildStatusClient
// ---------------------------------------------------------------------------

/// Scripted build client. Unscripted lookups answer `NotFound`.
#[derive(Debug, Default)]
pub struct FakeBuildStatusClient {
    repos: HashMap<String, Result<BuildRecord, RemoteError>>,
    branches: HashMap<(String, String), Result<BuildRecord, RemoteError>>,
    delays: HashMap<String, Duration>,
    hang: bool,
    branch_calls: AtomicUsize,
    repo_calls: AtomicUsize,
}

impl FakeBuildStatusClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the repository-level answer for `slug` (`owner/name`).
    pub fn with_repo(mut self, slug: &str, answer: Result<BuildRecord, RemoteError>) -> Self {
        self.repos.insert(slug.to_string(), answer);
        self
    }

    /// Script the branch-scoped answer for `slug` and `branch`.
    pub fn with_branch(
        mut self,
        slug: &str,
        branch: &str,
        answer: Result<BuildRecord, RemoteError>,
    ) -> Self {
        self.branches
            .insert((slug.to_string(), branch.to_string()), answer);
        self
    }

    /// Delay every answer for `slug`.
    pub fn with_delay(mut self, slug: &str, delay: Duration) -> Self {
        self.delays.insert(slug.to_string(), delay);
        self
    }

    /// Never answer.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn branch_calls(&self) -> usize {
        self.branch_calls.load(Ordering::SeqCst)
    }

    pub fn repo_calls(&self) -> usize {
        self.repo_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self, slug: &str) {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delays.get(slug) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl BuildStatusClient for FakeBuildStatusClient {
    async fn branch_build(
        &self,
        repo: &RepositoryIdentity,
        branch: &str,
    ) -> Result<BuildRecord, RemoteError> {
        self.branch_calls.fetch_add(1, Ordering::SeqCst);
        let slug = repo.slug();
        self.pause(&slug).await;
        self.branches
            .get(&(slug, branch.to_string()))
            .cloned()
            .unwrap_or(Err(RemoteError::NotFound))
    }

    async fn last_build(&self, repo: &RepositoryIdentity) -> Result<BuildRecord, RemoteError> {
        self.repo_calls.fetch_add(1, Ordering::SeqCst);
        let slug = repo.slug();
        self.pause(&slug).await;
        self.repos
            .get(&slug)
            .cloned()
            .unwrap_or(Err(RemoteError::NotFound))
    }
}
