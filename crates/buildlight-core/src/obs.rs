//! Structured observability hooks for status update cycles.
//!
//! Each cycle runs inside an `update_span` tagged with its sequence number.
//! Events are emitted at `info!` (or `warn!` for failures) with a stable
//! `event` field so log pipelines can filter on it.

use crate::error::StatusError;
use crate::identity::RepositoryIdentity;
use crate::snapshot::StatusSnapshot;
use tracing::{info, warn};

/// Span covering one update cycle. Attach with `tracing::Instrument`.
pub fn update_span(seq: u64) -> tracing::Span {
    tracing::info_span!("buildlight.update", seq = seq)
}

pub fn emit_update_started(seq: u64, workspace: &std::path::Path) {
    info!(event = "status.update_started", seq = seq, workspace = %workspace.display());
}

/// Branch-scoped record matched HEAD.
pub fn emit_branch_resolved(repo: &RepositoryIdentity, branch: &str, commit: &str) {
    info!(
        event = "status.branch_resolved",
        repo = %repo,
        branch = %branch,
        commit = %commit,
    );
}

/// Falling back to the repository-level record.
pub fn emit_fallback(repo: &RepositoryIdentity, branch: &str, reason: &str) {
    info!(event = "status.fallback", repo = %repo, branch = %branch, reason = %reason);
}

pub fn emit_resolved(seq: u64, snapshot: &StatusSnapshot) {
    info!(
        event = "status.resolved",
        seq = seq,
        state = ?snapshot.state,
        build_number = snapshot.build_number,
        label = %snapshot.label,
    );
}

pub fn emit_failed(seq: u64, error: &StatusError) {
    warn!(event = "status.failed", seq = seq, kind = error.kind(), error = %error);
}

/// A completion arrived after a newer request had started and was dropped.
pub fn emit_stale_discarded(seq: u64, newest: u64) {
    info!(event = "status.stale_discarded", seq = seq, newest = newest);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_span_create() {
        let span = update_span(7);
        let _entered = span.enter();
    }
}
