//! Canonical status snapshot handed to the presenter.

use crate::error::{Result, StatusError};
use crate::remote::{BuildRecord, BuildState};
use crate::vcs::short_commit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label shown when the repository-level record was used.
pub const FALLBACK_LABEL: &str = "master";

/// Displayable build states. `errored` and unknown states never get here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotState {
    Passed,
    Running,
    Failed,
}

impl TryFrom<&BuildState> for SnapshotState {
    type Error = StatusError;

    fn try_from(state: &BuildState) -> Result<Self> {
        match state {
            BuildState::Passed => Ok(SnapshotState::Passed),
            BuildState::Running => Ok(SnapshotState::Running),
            BuildState::Failed => Ok(SnapshotState::Failed),
            other => Err(StatusError::UnsupportedBuildState {
                state: other.as_str().to_string(),
            }),
        }
    }
}

/// Which record the snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotLabel {
    /// Branch record matching HEAD; holds the short commit id
    Commit(String),
    /// Repository-level fallback
    Fallback,
}

impl SnapshotLabel {
    pub fn commit(commit_id: &str) -> Self {
        SnapshotLabel::Commit(short_commit(commit_id).to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            SnapshotLabel::Commit(short) => short,
            SnapshotLabel::Fallback => FALLBACK_LABEL,
        }
    }
}

impl fmt::Display for SnapshotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciled build status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: SnapshotState,
    pub build_number: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
    pub label: SnapshotLabel,
}

impl StatusSnapshot {
    /// Map an authoritative record into a snapshot.
    ///
    /// A record without a build number is [`StatusError::NeverBuilt`]; a state
    /// outside passed/running/failed is [`StatusError::UnsupportedBuildState`].
    pub fn from_record(record: &BuildRecord, label: SnapshotLabel) -> Result<Self> {
        let build_number = record.build_number.ok_or(StatusError::NeverBuilt)?;
        let state = SnapshotState::try_from(&record.state)?;

        Ok(StatusSnapshot {
            state,
            build_number,
            started_at: record.started_at,
            duration_seconds: record.duration_seconds,
            label,
        })
    }

    /// Duration rounded to whole minutes.
    pub fn duration_minutes(&self) -> u64 {
        (self.duration_seconds + 30) / 60
    }
}
