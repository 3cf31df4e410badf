//! Shared transport helpers.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::SyncError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request. GitHub rejects requests without one.
pub const USER_AGENT: &str = "cowgill-bot";

/// A boxed future for async trait methods.
///
/// Keeps the service traits object-safe so the pipeline can hold
/// `Box<dyn ...>` and tests can substitute in-memory fakes.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Builds an HTTP client with a bounded timeout.
///
/// `on_error` picks the error kind of the component that owns the client.
pub(crate) fn build_client<F>(timeout: Duration, on_error: F) -> Result<reqwest::Client, SyncError>
where
    F: FnOnce(String) -> SyncError,
{
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| on_error(format!("failed to create HTTP client: {}", e)))
}

/// Describes a transport failure.
pub(crate) fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timeout".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        format!("request failed: {}", err)
    }
}

/// Returns a short, non-reversible identifier for a secret value.
///
/// Lets logs show that a token rotated without printing it.
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = fingerprint("refresh-token-abc");
        assert_eq!(a.len(), 16);
        assert_eq!(a, fingerprint("refresh-token-abc"));
        assert_ne!(a, fingerprint("refresh-token-xyz"));
        assert!(!a.contains("abc"));
    }

    #[test]
    fn fingerprint_of_known_value() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(fingerprint("abc"), "ba7816bf8f01cfea");
    }

    #[test]
    fn client_builds_with_timeout() {
        assert!(build_client(DEFAULT_TIMEOUT, SyncError::upstream).is_ok());
    }
}
