//! Status reconciliation pipeline.
//!
//! One cycle runs these steps in order, each awaited before the next:
//!
//! 1. marker check (`.travis.yml`); absent means "not a CI project"
//! 2. identity resolution; unresolved stops before any remote query
//! 3. branch and commit, gathered concurrently
//! 4. branch-scoped build query
//! 5. if that record's commit is HEAD it is authoritative, otherwise the
//!    repository-level record is
//! 6. state mapping into a [`StatusSnapshot`]

use crate::error::{Result, StatusError, VcsError};
use crate::identity::{RepositoryIdentity, RepositoryIdentityResolver};
use crate::metrics::METRICS;
use crate::obs;
use crate::remote::{BuildStatusClient, RemoteError};
use crate::snapshot::{SnapshotLabel, StatusSnapshot};
use crate::vcs::{VcsState, VcsStateReader};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// CI marker file, relative to the workspace root.
pub const CI_MARKER_FILE: &str = ".travis.yml";

/// Whether `<root>/.travis.yml` exists and is a regular file.
pub async fn is_ci_project(workspace_root: &Path) -> bool {
    tokio::fs::metadata(workspace_root.join(CI_MARKER_FILE))
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

pub struct StatusReconciler {
    resolver: RepositoryIdentityResolver,
    vcs: Arc<dyn VcsStateReader>,
    builds: Arc<dyn BuildStatusClient>,
}

impl StatusReconciler {
    pub fn new(vcs: Arc<dyn VcsStateReader>, builds: Arc<dyn BuildStatusClient>) -> Self {
        StatusReconciler {
            resolver: RepositoryIdentityResolver::new(),
            vcs,
            builds,
        }
    }

    pub fn resolver(&self) -> &RepositoryIdentityResolver {
        &self.resolver
    }

    /// Run one cycle. `Ok(None)` means the workspace is not a CI project.
    pub async fn reconcile(&self, workspace_root: &Path) -> Result<Option<StatusSnapshot>> {
        if !is_ci_project(workspace_root).await {
            debug!(workspace = %workspace_root.display(), "no CI marker file, skipping");
            return Ok(None);
        }

        let identity = self.resolver.resolve(workspace_root).await;
        if !identity.is_resolved() {
            return Err(StatusError::IdentityUnresolved);
        }

        let vcs = self.read_vcs_state(workspace_root).await?;
        self.reconcile_builds(&identity, &vcs).await.map(Some)
    }

    /// Branch and commit, queried concurrently; both must succeed.
    pub async fn read_vcs_state(&self, workspace_root: &Path) -> Result<VcsState> {
        let branch = async {
            self.vcs
                .current_branch(workspace_root)
                .await
                .map_err(|e| vcs_failure("current branch", e))
        };
        let commit = async {
            self.vcs
                .current_commit(workspace_root)
                .await
                .map_err(|e| vcs_failure("current commit", e))
        };
        let (branch, commit_id) = tokio::try_join!(branch, commit)?;
        Ok(VcsState { branch, commit_id })
    }

    /// Pick the authoritative record for `vcs` and map it.
    pub async fn reconcile_builds(
        &self,
        identity: &RepositoryIdentity,
        vcs: &VcsState,
    ) -> Result<StatusSnapshot> {
        let fallback_reason = match self.builds.branch_build(identity, &vcs.branch).await {
            Ok(record) if record.commit_id.as_deref() == Some(vcs.commit_id.as_str()) => {
                obs::emit_branch_resolved(identity, &vcs.branch, vcs.short_commit());
                return StatusSnapshot::from_record(&record, SnapshotLabel::commit(&vcs.commit_id));
            }
            Ok(record) => match record.commit_id {
                Some(built) => format!("branch build is for {built}, HEAD is {}", vcs.commit_id),
                None => "branch build has no commit".to_string(),
            },
            Err(e) => format!("branch query failed: {e}"),
        };

        obs::emit_fallback(identity, &vcs.branch, &fallback_reason);
        METRICS.inc_fallbacks();

        let record = self
            .builds
            .last_build(identity)
            .await
            .map_err(|e| match e {
                RemoteError::NotFound => StatusError::RepositoryNotFound {
                    slug: identity.slug(),
                },
                RemoteError::Failed(cause) => StatusError::QueryFailure(cause),
            })?;
        StatusSnapshot::from_record(&record, SnapshotLabel::Fallback)
    }
}

fn vcs_failure(what: &str, err: VcsError) -> StatusError {
    StatusError::QueryFailure(format!("could not read {what}: {err}"))
}
