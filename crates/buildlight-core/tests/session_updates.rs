//! Update cycles through a `Session`: overlap, timeouts, and the indicator.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use buildlight_core::fakes::{FakeBuildStatusClient, FakeVcs};
use buildlight_core::{
    BuildRecord, BuildState, CompletionPolicy, Endpoint, IndicatorState, Session, StatusError,
    StatusReconciler,
};
use tempfile::TempDir;

const HEAD: &str = "c0ffee1e5b3d4c6f8a0b1c2d3e4f5a6b7c8d9e0f";

/// A CI workspace whose settings pin the identity to `owner/name`.
fn ci_workspace(owner: &str, name: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".travis.yml"), "language: rust\n").unwrap();
    std::fs::create_dir(dir.path().join(".vscode")).unwrap();
    std::fs::write(
        dir.path().join(".vscode/settings.json"),
        format!(r#"{{"travis.username": "{owner}", "travis.repository": "{name}"}}"#),
    )
    .unwrap();
    dir
}

fn passed(number: u64) -> BuildRecord {
    BuildRecord {
        state: BuildState::Passed,
        build_number: Some(number),
        started_at: None,
        duration_seconds: 60,
        commit_id: None,
    }
}

fn session(builds: FakeBuildStatusClient, policy: CompletionPolicy) -> Session {
    let reconciler = StatusReconciler::new(Arc::new(FakeVcs::new("main", HEAD)), Arc::new(builds));
    Session::new(reconciler, Endpoint::public()).with_policy(policy)
}

/// Slow `octo/a` is requested first, fast `octo/b` second.
fn racing_client() -> FakeBuildStatusClient {
    FakeBuildStatusClient::new()
        .with_repo("octo/a", Ok(passed(1)))
        .with_repo("octo/b", Ok(passed(2)))
        .with_delay("octo/a", Duration::from_millis(300))
        .with_delay("octo/b", Duration::from_millis(20))
}

async fn race(session: &Session, first: &Path, second: &Path) {
    let slow = session.update_status(first);
    let fast = async {
        // Make sure the slow request has started (and taken its ticket) first.
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.update_status(second).await
    };
    let (slow, fast) = tokio::join!(slow, fast);
    assert!(slow.ticket < fast.ticket);
}

fn shown_build(session: &Session) -> u64 {
    match session.indicator().state() {
        IndicatorState::Success(snapshot) => snapshot.build_number,
        other => panic!("unexpected indicator state {other:?}"),
    }
}

#[tokio::test]
async fn test_latest_request_wins_over_late_completion() {
    let a = ci_workspace("octo", "a");
    let b = ci_workspace("octo", "b");
    let session = session(racing_client(), CompletionPolicy::LatestRequest);

    race(&session, a.path(), b.path()).await;

    assert_eq!(shown_build(&session), 2);
    assert_eq!(session.indicator().last_applied(), 2);
}

#[tokio::test]
async fn test_last_write_wins_keeps_late_completion() {
    let a = ci_workspace("octo", "a");
    let b = ci_workspace("octo", "b");
    let session = session(racing_client(), CompletionPolicy::LastWriteWins);

    race(&session, a.path(), b.path()).await;

    assert_eq!(shown_build(&session), 1);
    assert_eq!(session.indicator().last_applied(), 1);
}

#[tokio::test]
async fn test_stale_report_is_marked_unapplied() {
    let a = ci_workspace("octo", "a");
    let b = ci_workspace("octo", "b");
    let session = session(racing_client(), CompletionPolicy::LatestRequest);

    let slow = session.update_status(a.path());
    let fast = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.update_status(b.path()).await
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert!(!slow.applied);
    assert!(fast.applied);
    // The discarded outcome is still reported to the caller.
    assert!(matches!(slow.outcome, Ok(Some(ref s)) if s.build_number == 1));
}

#[tokio::test]
async fn test_hanging_query_times_out_into_error() {
    let ws = ci_workspace("octo", "widgets");
    let session = session(
        FakeBuildStatusClient::new().hanging(),
        CompletionPolicy::LatestRequest,
    )
    .with_cycle_timeout(Duration::from_millis(100));

    let report = session.update_status(ws.path()).await;

    assert!(matches!(report.outcome, Err(StatusError::QueryFailure(_))));
    assert!(report.applied);
    let state = session.indicator().state();
    assert!(!state.is_loading());
    assert!(matches!(state, IndicatorState::Error(StatusError::QueryFailure(_))));
}

#[tokio::test]
async fn test_indicator_loading_while_cycle_in_flight() {
    let ws = ci_workspace("octo", "a");
    let session = session(racing_client(), CompletionPolicy::LatestRequest);

    let update = session.update_status(ws.path());
    let probe = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.indicator().state()
    };
    let (report, during) = tokio::join!(update, probe);

    assert!(during.is_loading());
    assert!(report.applied);
    assert!(!session.indicator().state().is_loading());
}

#[tokio::test]
async fn test_not_a_ci_project_returns_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(FakeBuildStatusClient::new(), CompletionPolicy::LatestRequest);

    let report = session.update_status(dir.path()).await;

    assert_eq!(report.outcome, Ok(None));
    assert_eq!(session.indicator().state(), IndicatorState::Idle);
}

#[tokio::test]
async fn test_vcs_failure_surfaces_as_query_failure() {
    let ws = ci_workspace("octo", "widgets");
    let reconciler = StatusReconciler::new(
        Arc::new(FakeVcs::new("main", HEAD).failing_commit()),
        Arc::new(FakeBuildStatusClient::new().with_repo("octo/widgets", Ok(passed(4)))),
    );
    let session = Session::new(reconciler, Endpoint::public());

    let report = session.update_status(ws.path()).await;
    match report.outcome {
        Err(StatusError::QueryFailure(message)) => {
            assert!(message.contains("current commit"), "{message}")
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_browser_url_for_ci_workspace() {
    let ws = ci_workspace("octo", "widgets");
    let session = session(FakeBuildStatusClient::new(), CompletionPolicy::LatestRequest);

    assert_eq!(
        session.browser_url(ws.path()).await,
        Ok(Some("https://travis-ci.org/octo/widgets".to_string()))
    );

    let plain = tempfile::tempdir().unwrap();
    assert_eq!(session.browser_url(plain.path()).await, Ok(None));
}
