//! Presentation of indicator states as an icon, a one-line text and a
//! multi-line tooltip.

use buildlight_core::{IndicatorState, SnapshotState, StatusSnapshot};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Check,
    X,
    Clock,
    Stop,
    Sync,
}

impl Icon {
    pub fn name(&self) -> &'static str {
        match self {
            Icon::Check => "check",
            Icon::X => "x",
            Icon::Clock => "clock",
            Icon::Stop => "stop",
            Icon::Sync => "sync",
        }
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$({})", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub icon: Icon,
    pub text: String,
    pub tooltip: String,
}

/// Render an indicator state. `Idle` renders nothing.
pub fn render(state: &IndicatorState) -> Option<Rendered> {
    match state {
        IndicatorState::Idle => None,
        IndicatorState::Loading => Some(Rendered {
            icon: Icon::Sync,
            text: text(None, Icon::Sync),
            tooltip: "Fetching build status...".to_string(),
        }),
        IndicatorState::Success(s) | IndicatorState::Running(s) | IndicatorState::Failure(s) => {
            Some(render_snapshot(s))
        }
        IndicatorState::Error(e) => Some(Rendered {
            icon: Icon::Stop,
            text: text(None, Icon::Stop),
            tooltip: e.to_string(),
        }),
    }
}

pub fn render_snapshot(snapshot: &StatusSnapshot) -> Rendered {
    let (icon, verdict) = match snapshot.state {
        SnapshotState::Passed => (Icon::Check, "has passed."),
        SnapshotState::Running => (Icon::Clock, "is currently running."),
        SnapshotState::Failed => (Icon::X, "failed."),
    };
    let started = snapshot
        .started_at
        .map(|t| t.date_naive().to_string())
        .unwrap_or_else(|| "not yet".to_string());

    Rendered {
        icon,
        text: text(Some(snapshot.label.as_str()), icon),
        tooltip: format!(
            "Build {} {verdict}\nStarted: {started}\nDuration: {}",
            snapshot.build_number,
            minutes(snapshot.duration_minutes())
        ),
    }
}

fn text(identifier: Option<&str>, icon: Icon) -> String {
    match identifier {
        Some(id) => format!("Travis CI {id} {icon}"),
        None => format!("Travis CI {icon}"),
    }
}

fn minutes(n: u64) -> String {
    if n == 1 {
        "1 minute".to_string()
    } else {
        format!("{n} minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildlight_core::{SnapshotLabel, StatusError};
    use chrono::{TimeZone, Utc};

    fn snapshot(state: SnapshotState, seconds: u64, label: SnapshotLabel) -> StatusSnapshot {
        StatusSnapshot {
            state,
            build_number: 42,
            started_at: Some(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()),
            duration_seconds: seconds,
            label,
        }
    }

    #[test]
    fn test_passed_on_matching_commit() {
        let r = render_snapshot(&snapshot(
            SnapshotState::Passed,
            125,
            SnapshotLabel::Commit("9f2c1a7".to_string()),
        ));
        assert_eq!(r.icon, Icon::Check);
        assert_eq!(r.text, "Travis CI 9f2c1a7 $(check)");
        assert_eq!(
            r.tooltip,
            "Build 42 has passed.\nStarted: 2024-03-09\nDuration: 2 minutes"
        );
    }

    #[test]
    fn test_fallback_label_renders_master() {
        let r = render_snapshot(&snapshot(SnapshotState::Failed, 60, SnapshotLabel::Fallback));
        assert_eq!(r.text, "Travis CI master $(x)");
        assert!(r.tooltip.starts_with("Build 42 failed."));
        assert!(r.tooltip.ends_with("Duration: 1 minute"));
    }

    #[test]
    fn test_running_without_duration() {
        let mut s = snapshot(SnapshotState::Running, 0, SnapshotLabel::Fallback);
        s.started_at = None;
        let r = render_snapshot(&s);
        assert_eq!(r.icon, Icon::Clock);
        assert_eq!(
            r.tooltip,
            "Build 42 is currently running.\nStarted: not yet\nDuration: 0 minutes"
        );
    }

    #[test]
    fn test_minutes_round_half_up() {
        let r = render_snapshot(&snapshot(SnapshotState::Passed, 89, SnapshotLabel::Fallback));
        assert!(r.tooltip.ends_with("Duration: 1 minute"));
        let r = render_snapshot(&snapshot(SnapshotState::Passed, 90, SnapshotLabel::Fallback));
        assert!(r.tooltip.ends_with("Duration: 2 minutes"));
    }

    #[test]
    fn test_error_and_transient_states() {
        assert_eq!(render(&IndicatorState::Idle), None);

        let loading = render(&IndicatorState::Loading).unwrap();
        assert_eq!(loading.text, "Travis CI $(sync)");

        let err = render(&IndicatorState::Error(StatusError::RepositoryNotFound {
            slug: "octo/ghost".to_string(),
        }))
        .unwrap();
        assert_eq!(err.icon, Icon::Stop);
        assert_eq!(err.text, "Travis CI $(stop)");
        assert_eq!(err.tooltip, "Travis could not find octo/ghost");
    }
}
