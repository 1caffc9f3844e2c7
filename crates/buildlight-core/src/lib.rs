//! Buildlight Core Library
//!
//! Resolves the CI build status of a working copy and reconciles it with the
//! copy's live git state.
//!
//! ## Pipeline
//!
//! - [`identity`]: which `owner/name` the workspace belongs to
//! - [`vcs`]: checked-out branch and HEAD commit
//! - [`remote`]: branch-scoped and repository-level build records
//! - [`reconciler`]: which record to trust, mapped to a [`StatusSnapshot`]
//! - [`indicator`] / [`session`]: what the presenter shows, and when

pub mod error;
pub mod fakes;
pub mod identity;
pub mod indicator;
pub mod metrics;
pub mod obs;
pub mod reconciler;
pub mod remote;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod telemetry;
pub mod vcs;

pub use error::{Result, StatusError, VcsError};
pub use identity::{
    apply_rules, parse_remote_url, remote_url, Field, RepositoryIdentity,
    RepositoryIdentityResolver, Source, RESOLUTION_RULES,
};
pub use indicator::{CompletionPolicy, IndicatorState, StatusIndicator, UpdateOutcome, UpdateTicket};
pub use metrics::METRICS;
pub use reconciler::{is_ci_project, StatusReconciler, CI_MARKER_FILE};
pub use remote::{BuildRecord, BuildState, BuildStatusClient, RemoteError};
pub use session::{browser_url, connect, Session, SessionOptions, Startup, UpdateReport};
pub use settings::{WorkspaceCredentials, WorkspaceSettings};
pub use snapshot::{SnapshotLabel, SnapshotState, StatusSnapshot, FALLBACK_LABEL};
pub use telemetry::init_tracing;
pub use vcs::{GitCli, VcsState, VcsStateReader};

pub use travis_api::{Credentials, Endpoint, TransportOptions};
