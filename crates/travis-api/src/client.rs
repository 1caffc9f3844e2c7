//! Travis API client
//!
//! Two read-only queries are exposed: the latest build of a branch and the
//! repository summary with its last build. Neither retries.

use crate::credentials::{CredentialSource, Credentials};
use crate::endpoint::Endpoint;
use crate::error::TravisError;
use crate::transport::{build_http_client, TransportOptions};
use crate::wire::{BranchResponse, GithubAuthRequest, GithubAuthResponse, RepoResponse};
use crate::Result;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Media type selecting API v2.
pub const ACCEPT_V2: &str = "application/vnd.travis-ci.2.1+json";

/// Travis API client
pub struct TravisClient {
    endpoint: Endpoint,
    credentials: Arc<dyn CredentialSource>,
    http: reqwest::Client,
}

impl std::fmt::Debug for TravisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TravisClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl TravisClient {
    /// Create a client. Fails if the transport options carry an unusable proxy.
    pub fn new(
        endpoint: Endpoint,
        credentials: Arc<dyn CredentialSource>,
        options: &TransportOptions,
    ) -> Result<Self> {
        Url::parse(&endpoint.api_base)
            .map_err(|_| TravisError::InvalidBaseUrl(endpoint.api_base.clone()))?;
        let http = build_http_client(options)?;

        Ok(TravisClient {
            endpoint,
            credentials,
            http,
        })
    }

    /// Anonymous client with default transport options.
    pub fn anonymous(endpoint: Endpoint) -> Result<Self> {
        Self::new(
            endpoint,
            Arc::new(Credentials::None),
            &TransportOptions::default(),
        )
    }

    /// Latest build for `branch` of `owner/name`.
    pub async fn branch(&self, owner: &str, name: &str, branch: &str) -> Result<BranchResponse> {
        let url = self.url(&["repos", owner, name, "branches", branch])?;
        self.get_json(url).await
    }

    /// Repository summary for `owner/name`.
    pub async fn repository(&self, owner: &str, name: &str) -> Result<RepoResponse> {
        let url = self.url(&["repos", owner, name])?;
        self.get_json(url).await
    }

    /// Build `{api_base}/seg/seg/...`, percent-encoding each segment so that
    /// branch names containing `/` stay a single segment.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint.api_base)
            .map_err(|_| TravisError::InvalidBaseUrl(self.endpoint.api_base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| TravisError::InvalidBaseUrl(self.endpoint.api_base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "querying Travis API");
        let request = self.http.get(url.clone()).header("Accept", ACCEPT_V2);
        let request = self.authorize(request).await?;

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(TravisError::NotFound(url.path().to_string())),
            status if status.is_success() => {
                let body = response.bytes().await?;
                Ok(serde_json::from_slice(&body)?)
            }
            status => Err(TravisError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    /// Attach whatever credentials the source currently holds.
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.credentials.credentials().await {
            Credentials::None => Ok(request),
            Credentials::Basic { username, password } => {
                Ok(request.basic_auth(username, Some(password)))
            }
            Credentials::GithubToken(token) => {
                let access = self.exchange_github_token(&token).await?;
                Ok(request.header("Authorization", format!("token {access}")))
            }
        }
    }

    async fn exchange_github_token(&self, github_token: &str) -> Result<String> {
        let url = self.url(&["auth", "github"])?;
        let response = self
            .http
            .post(url)
            .header("Accept", ACCEPT_V2)
            .json(&GithubAuthRequest { github_token })
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "GitHub token exchange rejected");
            return Err(TravisError::Auth(format!(
                "token exchange returned status {}",
                response.status()
            )));
        }

        let body: GithubAuthResponse = response
            .json()
            .await
            .map_err(|e| TravisError::Auth(e.to_string()))?;
        Ok(body.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Loopback server answering every request with `status` and `body`.
    async fn canned_server(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    async fn client_for(status: &'static str, body: &'static str) -> TravisClient {
        let base = canned_server(status, body).await;
        TravisClient::anonymous(Endpoint::private(&base, None)).unwrap()
    }

    #[derive(Default)]
    struct CountingSource {
        reads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CredentialSource for CountingSource {
        async fn credentials(&self) -> Credentials {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Credentials::Basic {
                username: "octocat".to_string(),
                password: "hunter2".to_string(),
            }
        }
    }

    #[test]
    fn test_url_encodes_branch_with_slash() {
        let client = TravisClient::anonymous(Endpoint::public()).unwrap();
        let url = client
            .url(&["repos", "octo", "widgets", "branches", "feature/login"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.travis-ci.org/repos/octo/widgets/branches/feature%2Flogin"
        );
    }

    #[test]
    fn test_url_keeps_private_base_path() {
        let endpoint = Endpoint::private("https://ci.example.com/api/", None);
        let client = TravisClient::anonymous(endpoint).unwrap();
        let url = client.url(&["repos", "octo", "widgets"]).unwrap();
        assert_eq!(url.as_str(), "https://ci.example.com/api/repos/octo/widgets");
    }

    #[test]
    fn test_invalid_base_rejected() {
        let endpoint = Endpoint {
            api_base: "not a url".to_string(),
            web_base: String::new(),
        };
        assert!(matches!(
            TravisClient::anonymous(endpoint),
            Err(TravisError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let endpoint = Endpoint::private("http://127.0.0.1:1", None);
        let client = TravisClient::anonymous(endpoint).unwrap();
        let err = client.repository("octo", "widgets").await.unwrap_err();
        assert!(matches!(err, TravisError::Http(_)), "got {err:?}");
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_credentials_read_on_every_query() {
        let source = Arc::new(CountingSource::default());
        let client = TravisClient::new(
            Endpoint::private("http://127.0.0.1:1", None),
            source.clone(),
            &TransportOptions::default(),
        )
        .unwrap();

        let _ = client.repository("octo", "widgets").await;
        let _ = client.branch("octo", "widgets", "main").await;
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_404_maps_to_not_found() {
        let client = client_for("404 Not Found", "").await;
        let err = client.repository("octo", "ghost").await.unwrap_err();
        assert!(matches!(err, TravisError::NotFound(ref path) if path == "/repos/octo/ghost"));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let client = client_for("500 Internal Server Error", "oops").await;
        match client.branch("octo", "widgets", "main").await {
            Err(TravisError::Status { status, url }) => {
                assert_eq!(status, 500);
                assert!(url.ends_with("/repos/octo/widgets/branches/main"), "{url}");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_body_is_decoded() {
        let client = client_for(
            "200 OK",
            r#"{"repo": {"id": 1, "slug": "octo/widgets", "last_build_number": "12", "last_build_state": "passed"}}"#,
        )
        .await;
        let response = client.repository("octo", "widgets").await.unwrap();
        let repo = response.repo.expect("repo object");
        assert_eq!(repo.last_build_number, Some(12));
        assert_eq!(repo.last_build_state.as_deref(), Some("passed"));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let client = client_for("200 OK", "not json").await;
        let err = client.repository("octo", "widgets").await.unwrap_err();
        assert!(matches!(err, TravisError::Decode(_)), "got {err:?}");
    }
}
