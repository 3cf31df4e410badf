//! Diff-gated publishing of the event listing file.
//!
//! The listing lives in a version-controlled repository. Writes are
//! compare-and-swap: each carries the content hash read just before, and the
//! host rejects it if another writer got there first. There is no lock and
//! no retry; a conflict aborts the run.

use std::time::Duration;

use cowgill_core::{EventSnapshot, SnapshotChange, diff_snapshots};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::github::{GithubClient, GithubRepo};
use crate::http::{self, BoxFuture};

/// The stored listing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Version token that a conditional write must present.
    pub content_hash: String,
    /// Body in its storage encoding.
    pub content: String,
}

impl RemoteFile {
    /// Decodes and parses the stored body.
    pub fn snapshot(&self) -> SyncResult<EventSnapshot> {
        EventSnapshot::from_storage(&self.content)
            .map_err(|e| SyncError::repo_parse(format!("published listing is malformed: {}", e)))
    }
}

/// Outcome of a compare-and-swap write that reached the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file now holds the new content.
    Written,
    /// The file changed since `expected_version` was read; nothing was written.
    VersionConflict,
}

/// A file host supporting reads and compare-and-swap writes.
pub trait ContentStore: Send + Sync {
    fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, SyncResult<RemoteFile>>;

    /// Replaces `path` with `content` only if its version is still
    /// `expected_version`.
    fn conditional_write<'a>(
        &'a self,
        path: &'a str,
        expected_version: &'a str,
        content: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, SyncResult<WriteOutcome>>;
}

/// Files in a GitHub repository, via the contents API.
#[derive(Debug)]
pub struct GithubContents {
    client: GithubClient,
    branch: Option<String>,
}

impl GithubContents {
    pub fn new(repo: GithubRepo, branch: Option<String>, timeout: Duration) -> SyncResult<Self> {
        Ok(Self {
            client: GithubClient::new(repo, timeout, SyncError::repo_read)?,
            branch,
        })
    }

    async fn get_file(&self, path: &str) -> SyncResult<RemoteFile> {
        let mut request = self
            .client
            .request(Method::GET, &format!("contents/{}", path));
        if let Some(ref branch) = self.branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::repo_read(format!("read of {} {}", path, http::describe(&e))))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::repo_read(format!("failed to read {}: {}", path, e)))?;

        if status != StatusCode::OK {
            return Err(SyncError::repo_read(format!(
                "read of {} failed ({}): {}",
                path, status, body
            )));
        }

        let file: ContentsResponse = serde_json::from_str(&body).map_err(|e| {
            SyncError::repo_read(format!("invalid contents response for {}: {}", path, e))
        })?;

        if file.encoding.as_deref().is_some_and(|enc| enc != "base64") {
            return Err(SyncError::repo_read(format!(
                "unsupported content encoding for {}: {}",
                path,
                file.encoding.unwrap_or_default()
            )));
        }

        debug!(path, sha = %file.sha, "read published listing");
        Ok(RemoteFile {
            content_hash: file.sha,
            content: file.content,
        })
    }

    async fn put_file(
        &self,
        path: &str,
        expected_version: &str,
        content: &str,
        message: &str,
    ) -> SyncResult<WriteOutcome> {
        let payload = UpdateRequest {
            message,
            content,
            sha: expected_version,
            branch: self.branch.as_deref(),
        };

        let response = self
            .client
            .request(Method::PUT, &format!("contents/{}", path))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                SyncError::repo_write(format!("write of {} {}", path, http::describe(&e)))
            })?;

        match response.status() {
            StatusCode::OK => Ok(WriteOutcome::Written),
            StatusCode::CONFLICT => Ok(WriteOutcome::VersionConflict),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SyncError::repo_write(format!(
                    "write of {} failed ({}): {}",
                    path, status, body
                )))
            }
        }
    }
}

impl ContentStore for GithubContents {
    fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, SyncResult<RemoteFile>> {
        Box::pin(self.get_file(path))
    }

    fn conditional_write<'a>(
        &'a self,
        path: &'a str,
        expected_version: &'a str,
        content: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, SyncResult<WriteOutcome>> {
        Box::pin(self.put_file(path, expected_version, content, message))
    }
}

/// Response from the contents endpoint.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Body of a contents update.
#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    message: &'a str,
    content: &'a str,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Result of a synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The published listing already matches; nothing was written.
    UpToDate,
    /// The fresh listing was written.
    Published { changes: Vec<SnapshotChange> },
}

/// Publishes a fresh snapshot when it differs from the stored one.
pub struct ContentSynchronizer {
    store: Box<dyn ContentStore>,
    path: String,
    commit_message: String,
}

impl ContentSynchronizer {
    pub fn new(
        store: Box<dyn ContentStore>,
        path: impl Into<String>,
        commit_message: impl Into<String>,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            commit_message: commit_message.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Writes `fresh` unless it is semantically equal to the stored listing.
    ///
    /// The write is conditional on the hash read at the start of this call;
    /// a concurrent update surfaces as a version-conflict write error.
    pub async fn sync(&self, fresh: &EventSnapshot) -> SyncResult<SyncOutcome> {
        let remote = self.store.read(&self.path).await?;
        let published = remote.snapshot()?;

        if fresh.semantically_eq(&published) {
            info!(path = %self.path, events = fresh.len(), "event listing already up to date");
            return Ok(SyncOutcome::UpToDate);
        }

        let changes = diff_snapshots(&published, fresh);
        for change in &changes {
            warn!(path = %self.path, "{}", change);
        }

        let encoded = fresh.to_storage().map_err(|e| {
            SyncError::repo_write(format!("failed to serialize listing: {}", e)).with_source(e)
        })?;

        match self
            .store
            .conditional_write(
                &self.path,
                &remote.content_hash,
                &encoded,
                &self.commit_message,
            )
            .await?
        {
            WriteOutcome::Written => {
                info!(
                    path = %self.path,
                    events = fresh.len(),
                    changes = changes.len(),
                    "published event listing"
                );
                Ok(SyncOutcome::Published { changes })
            }
            WriteOutcome::VersionConflict => Err(SyncError::version_conflict(
                &self.path,
                &remote.content_hash,
            )),
        }
    }
}
