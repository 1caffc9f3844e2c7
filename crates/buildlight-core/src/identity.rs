//! Repository identity resolution
//!
//! The `(owner, name)` pair that keys every remote query comes from two
//! sources: explicit workspace settings and the `origin` remote recorded in
//! `.git/config`. Each field is resolved on its own by walking
//! [`RESOLUTION_RULES`] in order; the first source offering a non-empty value
//! wins. Resolution never fails; anything unreadable contributes empty
//! strings.

use crate::settings::WorkspaceSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Git configuration file, relative to the workspace root.
pub const GIT_CONFIG_FILE: &str = ".git/config";

/// Remote whose URL identifies the repository.
pub const ORIGIN_REMOTE: &str = "origin";

/// Owner and repository name. Either may be empty, meaning "unresolved".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub name: String,
}

impl RepositoryIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepositoryIdentity {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Both fields are known.
    pub fn is_resolved(&self) -> bool {
        !self.owner.is_empty() && !self.name.is_empty()
    }

    /// `owner/name`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn field(&self, field: Field) -> &str {
        match field {
            Field::Owner => &self.owner,
            Field::Name => &self.name,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Owner => &mut self.owner,
            Field::Name => &mut self.name,
        }
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where a candidate value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// `travis.username` / `travis.repository` in workspace settings
    Settings,
    /// URL of the `origin` remote
    RemoteUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Owner,
    Name,
}

/// Resolution order. Settings beat the remote URL, field by field.
pub const RESOLUTION_RULES: &[(Source, Field)] = &[
    (Source::Settings, Field::Owner),
    (Source::Settings, Field::Name),
    (Source::RemoteUrl, Field::Owner),
    (Source::RemoteUrl, Field::Name),
];

/// Apply `rules` in order, filling each field from the first source that has
/// a non-empty value for it. Sources are looked up at most once, and only if
/// a rule still needs them.
pub fn apply_rules<F>(rules: &[(Source, Field)], mut lookup: F) -> RepositoryIdentity
where
    F: FnMut(Source) -> RepositoryIdentity,
{
    let mut resolved = RepositoryIdentity::default();
    let mut loaded: Vec<(Source, RepositoryIdentity)> = Vec::new();

    for &(source, field) in rules {
        if !resolved.field(field).is_empty() {
            continue;
        }
        let candidate = match loaded.iter().find(|(s, _)| *s == source) {
            Some((_, c)) => c.clone(),
            None => {
                let c = lookup(source);
                loaded.push((source, c.clone()));
                c
            }
        };
        let value = candidate.field(field);
        if !value.is_empty() {
            *resolved.field_mut(field) = value.to_string();
        }
    }

    resolved
}

/// Resolves the identity of a workspace.
#[derive(Debug, Clone, Default)]
pub struct RepositoryIdentityResolver;

impl RepositoryIdentityResolver {
    pub fn new() -> Self {
        RepositoryIdentityResolver
    }

    /// Resolve `(owner, name)` for `workspace_root`. Never fails.
    pub async fn resolve(&self, workspace_root: &Path) -> RepositoryIdentity {
        let settings = WorkspaceSettings::load_async(workspace_root).await;
        let settings_identity = RepositoryIdentity::new(settings.username, settings.repository);

        // Only touch .git/config if settings leave a gap.
        let remote_identity = if settings_identity.is_resolved() {
            RepositoryIdentity::default()
        } else {
            identity_from_git_config(workspace_root).await
        };

        let identity = apply_rules(RESOLUTION_RULES, |source| match source {
            Source::Settings => settings_identity.clone(),
            Source::RemoteUrl => remote_identity.clone(),
        });
        debug!(owner = %identity.owner, name = %identity.name, "resolved repository identity");
        identity
    }
}

/// Identity from the `origin` remote of `<root>/.git/config`, or empty.
pub async fn identity_from_git_config(workspace_root: &Path) -> RepositoryIdentity {
    let path = workspace_root.join(GIT_CONFIG_FILE);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(_) => return RepositoryIdentity::default(),
    };
    match remote_url(&content, ORIGIN_REMOTE) {
        Some(url) => parse_remote_url(&url),
        None => RepositoryIdentity::default(),
    }
}

/// `url` of `[remote "<remote>"]` in a git config document.
///
/// Returns `None` when the document is malformed (an unterminated section
/// header), the section is missing, or the section has no `url`.
pub fn remote_url(config: &str, remote: &str) -> Option<String> {
    let wanted_quoted = format!("remote \"{remote}\"");
    let wanted_dotted = format!("remote.{remote}");
    let mut in_section = false;
    let mut url = None;

    for raw in config.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[') {
            let header = header.split_once(']')?.0.trim();
            in_section = header == wanted_quoted || header == wanted_dotted;
            continue;
        }
        if !in_section || url.is_some() {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim().eq_ignore_ascii_case("url") {
                url = Some(unquote(value.trim()).to_string());
            }
        }
    }

    url.filter(|u| !u.is_empty())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Extract `(owner, name)` from a remote URL.
///
/// Handles `scheme://[user@]host[:port]/owner/name[.git]` and scp-style
/// `[user@]host:owner/name[.git]`. Anything with fewer than two non-empty path
/// components yields an empty identity.
pub fn parse_remote_url(url: &str) -> RepositoryIdentity {
    let path = strip_host(url.trim());
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.split('/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
            RepositoryIdentity::new(owner, name)
        }
        _ => RepositoryIdentity::default(),
    }
}

fn strip_host(url: &str) -> &str {
    if let Some((_, rest)) = url.split_once("://") {
        return rest.split_once('/').map(|(_, path)| path).unwrap_or("");
    }
    match url.split_once(':') {
        Some((host, path)) if !host.contains('/') => path,
        _ => url,
    }
}
