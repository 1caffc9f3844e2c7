//! Travis API v2 payloads
//!
//! Only the fields the status pipeline reads are modelled; everything else in
//! the payload is ignored. Travis serialises build numbers as strings, so they
//! are accepted in either form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `GET /repos/{owner}/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoResponse {
    #[serde(default)]
    pub repo: Option<Repo>,
}

/// Repository summary including its most recent build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repo {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "de_build_number")]
    pub last_build_number: Option<u64>,
    #[serde(default)]
    pub last_build_state: Option<String>,
    #[serde(default)]
    pub last_build_duration: Option<u64>,
    #[serde(default)]
    pub last_build_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_build_finished_at: Option<DateTime<Utc>>,
}

/// `GET /repos/{owner}/{name}/branches/{branch}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchResponse {
    #[serde(default)]
    pub branch: Option<BranchBuild>,
    #[serde(default)]
    pub commit: Option<Commit>,
}

/// Latest build on a branch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchBuild {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "de_build_number")]
    pub number: Option<u64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Commit a branch build ran against
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /auth/github` request body
#[derive(Debug, Serialize)]
pub(crate) struct GithubAuthRequest<'a> {
    pub github_token: &'a str,
}

/// `POST /auth/github` response body
#[derive(Debug, Deserialize)]
pub(crate) struct GithubAuthResponse {
    pub access_token: String,
}

fn de_build_number<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid build number: {s:?}"))),
    }
}
