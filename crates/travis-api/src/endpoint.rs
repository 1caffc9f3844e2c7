//! API and web base selection
//!
//! Travis runs two public installations (`travis-ci.org` for open source,
//! `travis-ci.com` for "pro" accounts). A private installation can be
//! addressed by giving explicit bases.

use serde::{Deserialize, Serialize};

const ORG_API: &str = "https://api.travis-ci.org";
const ORG_WEB: &str = "https://travis-ci.org";
const PRO_API: &str = "https://api.travis-ci.com";
const PRO_WEB: &str = "https://travis-ci.com";

/// Which Travis installation to talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL of the REST API (no trailing slash)
    pub api_base: String,
    /// Base URL of the web UI (no trailing slash)
    pub web_base: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::public()
    }
}

impl Endpoint {
    /// travis-ci.org
    pub fn public() -> Self {
        Endpoint {
            api_base: ORG_API.to_string(),
            web_base: ORG_WEB.to_string(),
        }
    }

    /// travis-ci.com
    pub fn pro() -> Self {
        Endpoint {
            api_base: PRO_API.to_string(),
            web_base: PRO_WEB.to_string(),
        }
    }

    /// Pick between the two public installations.
    pub fn for_mode(pro: bool) -> Self {
        if pro {
            Self::pro()
        } else {
            Self::public()
        }
    }

    /// A private installation. When `web_base` is `None` the web UI is
    /// assumed to live at the API host with a leading `api.` removed.
    pub fn private(api_base: &str, web_base: Option<&str>) -> Self {
        let api_base = api_base.trim_end_matches('/').to_string();
        let web_base = match web_base {
            Some(web) => web.trim_end_matches('/').to_string(),
            None => api_base.replacen("://api.", "://", 1),
        };
        Endpoint { api_base, web_base }
    }

    /// Page for a repository in the web UI.
    pub fn repository_page(&self, owner: &str, name: &str) -> String {
        format!("{}/{}/{}", self.web_base, owner, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        assert_eq!(Endpoint::for_mode(false), Endpoint::public());
        assert_eq!(Endpoint::for_mode(true).api_base, "https://api.travis-ci.com");
        assert_eq!(Endpoint::default().web_base, "https://travis-ci.org");
    }

    #[test]
    fn test_private_endpoint_derives_web_base() {
        let ep = Endpoint::private("https://api.travis.example.com/", None);
        assert_eq!(ep.api_base, "https://api.travis.example.com");
        assert_eq!(ep.web_base, "https://travis.example.com");

        let ep = Endpoint::private("https://ci.example.com/api", Some("https://ci.example.com/"));
        assert_eq!(ep.web_base, "https://ci.example.com");
    }

    #[test]
    fn test_repository_page() {
        assert_eq!(
            Endpoint::pro().repository_page("octo", "widgets"),
            "https://travis-ci.com/octo/widgets"
        );
    }
}
