//! Explicitly owned session: one reconciler, one indicator, one endpoint.
//!
//! Everything a status update needs is constructed once in [`connect`] and
//! passed around by reference; there is no process-global state besides the
//! metrics counters.

use crate::error::{Result, StatusError};
use crate::identity::RepositoryIdentity;
use crate::indicator::{CompletionPolicy, StatusIndicator, UpdateOutcome, UpdateTicket};
use crate::metrics::METRICS;
use crate::obs;
use crate::reconciler::{is_ci_project, StatusReconciler};
use crate::settings::{WorkspaceCredentials, WorkspaceSettings};
use crate::vcs::GitCli;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{warn, Instrument};
use travis_api::{Endpoint, TransportOptions, TravisClient, TravisError};

/// Upper bound on a whole update cycle.
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(30);

/// What one call to [`Session::update_status`] produced.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub ticket: UpdateTicket,
    pub outcome: UpdateOutcome,
    /// Whether the indicator now shows this outcome
    pub applied: bool,
}

pub struct Session {
    reconciler: StatusReconciler,
    indicator: StatusIndicator,
    endpoint: Endpoint,
    cycle_timeout: Duration,
}

impl Session {
    pub fn new(reconciler: StatusReconciler, endpoint: Endpoint) -> Self {
        Session {
            reconciler,
            indicator: StatusIndicator::default(),
            endpoint,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.indicator = StatusIndicator::new(policy);
        self
    }

    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    pub fn indicator(&self) -> &StatusIndicator {
        &self.indicator
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run one update cycle and publish its outcome to the indicator.
    ///
    /// The indicator is `Loading` as soon as this is called. A cycle that
    /// exceeds the timeout completes with [`StatusError::QueryFailure`].
    pub async fn update_status(&self, workspace_root: &Path) -> UpdateReport {
        let ticket = self.indicator.begin();
        let seq = ticket.seq;

        async {
            obs::emit_update_started(seq, workspace_root);

            let outcome = match tokio::time::timeout(
                self.cycle_timeout,
                self.reconciler.reconcile(workspace_root),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(StatusError::QueryFailure(format!(
                    "timed out after {}s",
                    self.cycle_timeout.as_secs_f32()
                ))),
            };

            match &outcome {
                Ok(Some(snapshot)) => obs::emit_resolved(seq, snapshot),
                Ok(None) => {}
                Err(e) => {
                    METRICS.inc_failures();
                    obs::emit_failed(seq, e);
                }
            }

            let applied = self.indicator.complete(ticket, &outcome);
            UpdateReport {
                ticket,
                outcome,
                applied,
            }
        }
        .instrument(obs::update_span(seq))
        .await
    }

    /// Resolved identity of `workspace_root` (possibly unresolved).
    pub async fn identity(&self, workspace_root: &Path) -> RepositoryIdentity {
        self.reconciler.resolver().resolve(workspace_root).await
    }

    /// Web page of the workspace's repository. `Ok(None)` if the workspace is
    /// not a CI project.
    pub async fn browser_url(&self, workspace_root: &Path) -> Result<Option<String>> {
        if !is_ci_project(workspace_root).await {
            return Ok(None);
        }
        let identity = self.identity(workspace_root).await;
        browser_url(&identity, &self.endpoint).map(Some)
    }
}

/// `{web_base}/{owner}/{name}` for a resolved identity.
pub fn browser_url(identity: &RepositoryIdentity, endpoint: &Endpoint) -> Result<String> {
    if !identity.is_resolved() {
        return Err(StatusError::IdentityUnresolved);
    }
    Ok(endpoint.repository_page(&identity.owner, &identity.name))
}

/// Inputs to [`connect`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub workspace_root: PathBuf,
    /// Overrides `travis.pro` from settings
    pub pro: Option<bool>,
    /// Private-instance API base; overrides settings and `pro`
    pub api_base: Option<String>,
    pub web_base: Option<String>,
    pub transport: TransportOptions,
    pub cycle_timeout: Duration,
    pub policy: CompletionPolicy,
}

impl SessionOptions {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        SessionOptions {
            workspace_root: workspace_root.into(),
            pro: None,
            api_base: None,
            web_base: None,
            transport: TransportOptions::from_env(),
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            policy: CompletionPolicy::default(),
        }
    }

    /// Endpoint from options, falling back to workspace settings.
    pub fn endpoint(&self, settings: &WorkspaceSettings) -> Endpoint {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        let api_base = self.api_base.clone().or_else(|| non_empty(&settings.api_base));
        let web_base = self.web_base.clone().or_else(|| non_empty(&settings.web_base));

        match api_base {
            Some(api) => Endpoint::private(&api, web_base.as_deref()),
            None => Endpoint::for_mode(self.pro.unwrap_or(settings.pro)),
        }
    }
}

/// A ready session plus warnings the user should see once.
pub struct Startup {
    pub session: Session,
    pub warnings: Vec<StatusError>,
}

/// Build a Travis-backed session for a workspace.
///
/// The transport (and with it the proxy) is set up exactly once here. An
/// unusable proxy address does not abort startup: the session connects
/// directly and [`StatusError::ProxyConfigurationInvalid`] is returned as a
/// warning.
pub fn connect(options: SessionOptions) -> Result<Startup> {
    let settings = WorkspaceSettings::load(&options.workspace_root);
    let endpoint = options.endpoint(&settings);
    let credentials = Arc::new(WorkspaceCredentials::new(&options.workspace_root));
    let mut warnings = Vec::new();

    let client = match TravisClient::new(endpoint.clone(), credentials.clone(), &options.transport) {
        Ok(client) => client,
        Err(TravisError::InvalidProxy { address, reason }) => {
            warn!(proxy = %address, reason = %reason, "ignoring invalid proxy configuration");
            warnings.push(StatusError::ProxyConfigurationInvalid { address, reason });
            TravisClient::new(
                endpoint.clone(),
                credentials,
                &options.transport.clone().without_proxy(),
            )
            .map_err(|e| StatusError::InvalidConfiguration(e.to_string()))?
        }
        Err(e) => return Err(StatusError::InvalidConfiguration(e.to_string())),
    };

    let reconciler = StatusReconciler::new(Arc::new(GitCli::new()), Arc::new(client));
    let session = Session::new(reconciler, endpoint)
        .with_policy(options.policy)
        .with_cycle_timeout(options.cycle_timeout);

    Ok(Startup { session, warnings })
}
