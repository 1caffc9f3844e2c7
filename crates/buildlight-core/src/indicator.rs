//! Indicator state machine.
//!
//! ```text
//! Idle ──begin──▶ Loading ──complete──▶ Success | Running | Failure | Error
//!   ▲                ▲                                 │
//!   └── not a CI ────┴──────────── begin ◀─────────────┘
//! ```
//!
//! `Loading` is entered synchronously in [`StatusIndicator::begin`]. Updates
//! are never cancelled, only superseded; how a late completion is treated is
//! decided by the [`CompletionPolicy`].

use crate::error::StatusError;
use crate::metrics::METRICS;
use crate::obs;
use crate::snapshot::{SnapshotState, StatusSnapshot};
use std::sync::{Mutex, MutexGuard};

/// Result of one update cycle. `Ok(None)` means "not a CI project".
pub type UpdateOutcome = Result<Option<StatusSnapshot>, StatusError>;

/// What the presenter shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorState {
    Idle,
    Loading,
    Success(StatusSnapshot),
    Running(StatusSnapshot),
    Failure(StatusSnapshot),
    Error(StatusError),
}

impl IndicatorState {
    pub fn from_outcome(outcome: &UpdateOutcome) -> Self {
        match outcome {
            Ok(None) => IndicatorState::Idle,
            Ok(Some(snapshot)) => match snapshot.state {
                SnapshotState::Passed => IndicatorState::Success(snapshot.clone()),
                SnapshotState::Running => IndicatorState::Running(snapshot.clone()),
                SnapshotState::Failed => IndicatorState::Failure(snapshot.clone()),
            },
            Err(e) => IndicatorState::Error(e.clone()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, IndicatorState::Loading)
    }
}

/// How racing completions are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Only the most recently started request may update the display;
    /// older completions are discarded.
    #[default]
    LatestRequest,
    /// Whichever completion arrives last is shown.
    LastWriteWins,
}

/// Handle for one started update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UpdateTicket {
    pub seq: u64,
}

#[derive(Debug)]
struct Inner {
    state: IndicatorState,
    newest_started: u64,
    last_applied: u64,
}

/// The single status indicator of a session.
#[derive(Debug)]
pub struct StatusIndicator {
    policy: CompletionPolicy,
    inner: Mutex<Inner>,
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new(CompletionPolicy::default())
    }
}

impl StatusIndicator {
    pub fn new(policy: CompletionPolicy) -> Self {
        StatusIndicator {
            policy,
            inner: Mutex::new(Inner {
                state: IndicatorState::Idle,
                newest_started: 0,
                last_applied: 0,
            }),
        }
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The state is plain data; a panic elsewhere cannot leave it torn.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start an update: allocate the next sequence number and enter `Loading`.
    pub fn begin(&self) -> UpdateTicket {
        let mut inner = self.lock();
        inner.newest_started += 1;
        inner.state = IndicatorState::Loading;
        METRICS.inc_updates_started();
        UpdateTicket {
            seq: inner.newest_started,
        }
    }

    /// Finish an update. Returns `false` if the outcome was discarded.
    pub fn complete(&self, ticket: UpdateTicket, outcome: &UpdateOutcome) -> bool {
        let mut inner = self.lock();
        if self.policy == CompletionPolicy::LatestRequest && ticket.seq < inner.newest_started {
            obs::emit_stale_discarded(ticket.seq, inner.newest_started);
            METRICS.inc_stale_discarded();
            return false;
        }
        inner.state = IndicatorState::from_outcome(outcome);
        inner.last_applied = ticket.seq;
        true
    }

    pub fn state(&self) -> IndicatorState {
        self.lock().state.clone()
    }

    /// Sequence of the completion currently displayed (0 if none).
    pub fn last_applied(&self) -> u64 {
        self.lock().last_applied
    }
}
