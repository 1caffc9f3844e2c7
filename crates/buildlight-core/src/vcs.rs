//! Version-control state of a working copy.
//!
//! The reconciler only needs two facts, the checked-out branch and the full
//! HEAD commit. [`GitCli`] obtains both by shelling out to `git`.

use crate::error::VcsError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;

/// Branch and commit of a working copy at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsState {
    pub branch: String,
    /// Full-length commit hash
    pub commit_id: String,
}

impl VcsState {
    /// First 7 characters of the commit, for display only.
    pub fn short_commit(&self) -> &str {
        short_commit(&self.commit_id)
    }
}

/// First 7 characters of a commit id (or the whole id if shorter).
pub fn short_commit(commit_id: &str) -> &str {
    match commit_id.char_indices().nth(7) {
        Some((idx, _)) => &commit_id[..idx],
        None => commit_id,
    }
}

/// Reads branch and commit for a working copy.
///
/// The two queries are independent and may fail independently.
#[async_trait]
pub trait VcsStateReader: Send + Sync {
    async fn current_branch(&self, workspace_root: &Path) -> Result<String, VcsError>;

    async fn current_commit(&self, workspace_root: &Path) -> Result<String, VcsError>;
}

/// [`VcsStateReader`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        GitCli
    }

    async fn rev_parse(&self, repo_dir: &Path, args: &[&str]) -> Result<String, VcsError> {
        let command = args.join(" ");
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| VcsError::Spawn(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VcsError::CommandFailed { command, stderr });
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            return Err(VcsError::EmptyOutput { command });
        }
        Ok(value)
    }
}

#[async_trait]
impl VcsStateReader for GitCli {
    /// `git rev-parse --abbrev-ref HEAD`; a detached HEAD reports `HEAD`.
    async fn current_branch(&self, workspace_root: &Path) -> Result<String, VcsError> {
        self.rev_parse(workspace_root, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await
    }

    async fn current_commit(&self, workspace_root: &Path) -> Result<String, VcsError> {
        self.rev_parse(workspace_root, &["rev-parse", "HEAD"]).await
    }
}
