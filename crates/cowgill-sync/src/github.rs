//! GitHub REST API plumbing shared by the secret vault and content store.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};

use crate::error::SyncError;
use crate::http;

/// Default GitHub API base URL.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// A repository on a GitHub API host, with the token used to access it.
#[derive(Clone)]
pub struct GithubRepo {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    token: String,
}

impl GithubRepo {
    pub fn new(
        api_base: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    /// Builds `{api_base}/repos/{owner}/{repo}/{path}`.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for GithubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubRepo")
            .field("api_base", &self.api_base)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// An authenticated client for one repository.
#[derive(Debug, Clone)]
pub(crate) struct GithubClient {
    repo: GithubRepo,
    http_client: reqwest::Client,
}

impl GithubClient {
    pub(crate) fn new<F>(repo: GithubRepo, timeout: Duration, on_error: F) -> Result<Self, SyncError>
    where
        F: FnOnce(String) -> SyncError,
    {
        Ok(Self {
            http_client: http::build_client(timeout, on_error)?,
            repo,
        })
    }

    /// Starts a request to a repository-relative path with GitHub's headers.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, self.repo.url(path))
            .headers(Self::headers())
            .bearer_auth(&self.repo.token)
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers
    }
}
