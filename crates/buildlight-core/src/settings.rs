//! Per-workspace settings
//!
//! Settings live in `.vscode/settings.json` under `travis.*` keys, the same
//! file an editor integration writes. Every field is optional. A missing,
//! unreadable or malformed file behaves like an empty one.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use travis_api::{CredentialSource, Credentials};
use tracing::debug;

/// Settings file, relative to the workspace root.
pub const SETTINGS_FILE: &str = ".vscode/settings.json";

/// Environment overrides for credentials.
pub const ENV_GITHUB_TOKEN: &str = "BUILDLIGHT_GITHUB_TOKEN";
pub const ENV_GITHUB_USER: &str = "BUILDLIGHT_GITHUB_USER";
pub const ENV_GITHUB_PASSWORD: &str = "BUILDLIGHT_GITHUB_PASSWORD";

/// Recognised `travis.*` keys
///
/// Each key is decoded on its own: a `null` or mistyped value falls back to
/// the default for that key only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(rename = "travis.username", default, deserialize_with = "lenient")]
    pub username: String,

    #[serde(rename = "travis.repository", default, deserialize_with = "lenient")]
    pub repository: String,

    #[serde(rename = "travis.pro", default, deserialize_with = "lenient")]
    pub pro: bool,

    #[serde(rename = "travis.github_oauth_token", default, deserialize_with = "lenient")]
    pub github_oauth_token: String,

    #[serde(rename = "travis.github_user", default, deserialize_with = "lenient")]
    pub github_user: String,

    #[serde(rename = "travis.github_password", default, deserialize_with = "lenient")]
    pub github_password: String,

    #[serde(rename = "travis.api_base", default, deserialize_with = "lenient")]
    pub api_base: String,

    #[serde(rename = "travis.web_base", default, deserialize_with = "lenient")]
    pub web_base: String,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl WorkspaceSettings {
    pub fn path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(SETTINGS_FILE)
    }

    /// Parse settings JSON. `null` and non-object documents are rejected.
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Load settings, collapsing every failure to defaults.
    pub fn load(workspace_root: &Path) -> Self {
        let path = Self::path(workspace_root);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        Self::parse(&content).unwrap_or_else(|e| {
            debug!(path = %path.display(), error = %e, "ignoring malformed settings file");
            Self::default()
        })
    }

    /// Async variant of [`WorkspaceSettings::load`].
    pub async fn load_async(workspace_root: &Path) -> Self {
        let path = Self::path(workspace_root);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::parse(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Credentials carried by these settings alone.
    pub fn credentials(&self) -> Credentials {
        Credentials::from_parts(
            Some(&self.github_oauth_token),
            Some(&self.github_user),
            Some(&self.github_password),
        )
    }
}

/// Credential source that re-reads the workspace settings on every query.
///
/// Non-empty environment overrides take precedence over the file.
#[derive(Debug, Clone)]
pub struct WorkspaceCredentials {
    workspace_root: PathBuf,
}

impl WorkspaceCredentials {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        WorkspaceCredentials {
            workspace_root: workspace_root.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for WorkspaceCredentials {
    async fn credentials(&self) -> Credentials {
        let settings = WorkspaceSettings::load_async(&self.workspace_root).await;
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let token = env(ENV_GITHUB_TOKEN).unwrap_or(settings.github_oauth_token);
        let user = env(ENV_GITHUB_USER).unwrap_or(settings.github_user);
        let password = env(ENV_GITHUB_PASSWORD).unwrap_or(settings.github_password);

        Credentials::from_parts(Some(&token), Some(&user), Some(&password))
    }
}
