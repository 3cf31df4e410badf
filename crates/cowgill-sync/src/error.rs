//! Error types for the synchronization pipeline.
//!
//! Every error aborts the run. The [`SyncErrorKind`] names the boundary
//! that failed so the single diagnostic line tells the operator which step
//! to look at.

use std::fmt;
use thiserror::Error;

/// The boundary at which a pipeline error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncErrorKind {
    /// Refresh-token exchange failed.
    Auth,
    /// Sealing a secret failed (malformed key material).
    Encryption,
    /// Public-key fetch or secret upsert failed.
    Vault,
    /// Fetching club events failed.
    Upstream,
    /// Reading the published file failed.
    RepoRead,
    /// The published file does not contain a valid snapshot.
    RepoParse,
    /// Writing the published file failed, including version conflicts.
    RepoWrite,
}

impl SyncErrorKind {
    /// Returns a stable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth_error",
            Self::Encryption => "encryption_error",
            Self::Vault => "vault_error",
            Self::Upstream => "upstream_error",
            Self::RepoRead => "repo_read_error",
            Self::RepoParse => "repo_parse_error",
            Self::RepoWrite => "repo_write_error",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that aborted a pipeline run.
#[derive(Debug, Error)]
pub struct SyncError {
    kind: SyncErrorKind,
    message: String,
    /// Pipeline step that was running, set by the driver.
    step: Option<&'static str>,
    conflict: bool,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SyncError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            step: None,
            conflict: false,
            source: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Auth, message)
    }

    pub fn encryption(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Encryption, message)
    }

    pub fn vault(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Vault, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Upstream, message)
    }

    pub fn repo_read(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::RepoRead, message)
    }

    pub fn repo_parse(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::RepoParse, message)
    }

    pub fn repo_write(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::RepoWrite, message)
    }

    /// Creates a write error for a stale version precondition.
    pub fn version_conflict(path: &str, expected_version: &str) -> Self {
        Self {
            conflict: true,
            ..Self::repo_write(format!(
                "{} changed since it was read (expected version {})",
                path, expected_version
            ))
        }
    }

    /// Sets the pipeline step this error occurred in.
    pub fn with_step(mut self, step: &'static str) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> SyncErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn step(&self) -> Option<&'static str> {
        self.step
    }

    /// Returns true if a concurrent writer updated the file first.
    pub fn is_version_conflict(&self) -> bool {
        self.conflict
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(step) = self.step {
            write!(f, "[{}] ", step)?;
        }
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A specialized Result type for pipeline operations.
pub type SyncResult<T> = Result<T, SyncError>;
