//! In-memory fakes for the pipeline's service traits.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use cowgill_core::{Event, EventSnapshot};

use crate::content::{ContentStore, RemoteFile, WriteOutcome};
use crate::error::{SyncError, SyncResult};
use crate::http::BoxFuture;
use crate::oauth::{Credential, TokenExchange};
use crate::strava::EventSource;
use crate::vault::{PublicKeyMaterial, SealedSecret, SecretVault};

/// Token endpoint handing out a fixed refresh token.
#[derive(Clone, Default)]
pub(crate) struct StaticExchange {
    refresh_token: Option<String>,
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
}

impl StaticExchange {
    pub(crate) fn returning(refresh_token: &str) -> Self {
        Self {
            refresh_token: Some(refresh_token.to_string()),
            ..Default::default()
        }
    }

    /// An exchange that always fails.
    pub(crate) fn failing() -> Self {
        Self::default()
    }
}

impl TokenExchange for StaticExchange {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, SyncResult<Credential>> {
        self.calls.lock().unwrap().push(refresh_token.to_string());
        let result = match self.refresh_token {
            Some(ref rotated) => Ok(Credential {
                token_type: "Bearer".to_string(),
                access_token: "access-token".to_string(),
                refresh_token: rotated.clone(),
                expires_at: Utc::now() + Duration::hours(6),
            }),
            None => Err(SyncError::auth("token refresh failed (401 Unauthorized)")),
        };
        Box::pin(async move { result })
    }
}

/// Vault recording every call.
#[derive(Clone, Default)]
pub(crate) struct RecordingVault {
    key: Option<PublicKeyMaterial>,
    pub(crate) key_fetches: Arc<Mutex<usize>>,
    pub(crate) writes: Arc<Mutex<Vec<(String, SealedSecret)>>>,
}

impl RecordingVault {
    pub(crate) fn with_key(key_id: &str, key: &str) -> Self {
        Self {
            key: Some(PublicKeyMaterial {
                key_id: key_id.to_string(),
                key: key.to_string(),
            }),
            ..Default::default()
        }
    }

    pub(crate) fn key_fetch_count(&self) -> usize {
        *self.key_fetches.lock().unwrap()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl SecretVault for RecordingVault {
    fn public_key(&self) -> BoxFuture<'_, SyncResult<PublicKeyMaterial>> {
        *self.key_fetches.lock().unwrap() += 1;
        let key = self
            .key
            .clone()
            .ok_or_else(|| SyncError::vault("public key fetch failed (404 Not Found)"));
        Box::pin(async move { key })
    }

    fn put_secret<'a>(
        &'a self,
        name: &'a str,
        secret: &'a SealedSecret,
    ) -> BoxFuture<'a, SyncResult<()>> {
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), secret.clone()));
        Box::pin(async { Ok(()) })
    }
}

/// Event source returning a fixed listing.
#[derive(Clone, Default)]
pub(crate) struct FixedEvents {
    events: Option<Vec<Event>>,
    pub(crate) tokens_seen: Arc<Mutex<Vec<String>>>,
}

impl FixedEvents {
    pub(crate) fn new(events: Vec<Event>) -> Self {
        Self {
            events: Some(events),
            ..Default::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self::default()
    }
}

impl EventSource for FixedEvents {
    fn list_events<'a>(&'a self, access_token: &'a str) -> BoxFuture<'a, SyncResult<Vec<Event>>> {
        self.tokens_seen
            .lock()
            .unwrap()
            .push(access_token.to_string());
        let result = self
            .events
            .clone()
            .ok_or_else(|| SyncError::upstream("events request failed (503 Service Unavailable)"));
        Box::pin(async move { result })
    }
}

#[derive(Default)]
struct MemoryFile {
    content: String,
    version: u64,
    writes: usize,
    /// Content another writer stores right after the next read.
    intrusion: Option<String>,
}

impl MemoryFile {
    fn hash(&self) -> String {
        format!("v{}", self.version)
    }
}

/// Single-file store with compare-and-swap semantics.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    file: Arc<Mutex<MemoryFile>>,
}

impl MemoryStore {
    pub(crate) fn with_snapshot(snapshot: &EventSnapshot) -> Self {
        Self::with_raw_content(&snapshot.to_storage().unwrap())
    }

    pub(crate) fn with_raw_content(content: &str) -> Self {
        let store = Self::default();
        store.file.lock().unwrap().content = content.to_string();
        store
    }

    /// Simulates a concurrent writer updating the file between read and write.
    pub(crate) fn change_after_read(&self, snapshot: &EventSnapshot) {
        self.file.lock().unwrap().intrusion = Some(snapshot.to_storage().unwrap());
    }

    pub(crate) fn write_count(&self) -> usize {
        self.file.lock().unwrap().writes
    }

    pub(crate) fn current_snapshot(&self) -> EventSnapshot {
        EventSnapshot::from_storage(&self.file.lock().unwrap().content).unwrap()
    }
}

impl ContentStore for MemoryStore {
    fn read<'a>(&'a self, _path: &'a str) -> BoxFuture<'a, SyncResult<RemoteFile>> {
        let mut file = self.file.lock().unwrap();
        let remote = RemoteFile {
            content_hash: file.hash(),
            content: file.content.clone(),
        };
        if let Some(content) = file.intrusion.take() {
            file.content = content;
            file.version += 1;
        }
        Box::pin(async move { Ok(remote) })
    }

    fn conditional_write<'a>(
        &'a self,
        _path: &'a str,
        expected_version: &'a str,
        content: &'a str,
        _message: &'a str,
    ) -> BoxFuture<'a, SyncResult<WriteOutcome>> {
        let mut file = self.file.lock().unwrap();
        let outcome = if file.hash() != expected_version {
            WriteOutcome::VersionConflict
        } else {
            file.content = content.to_string();
            file.version += 1;
            file.writes += 1;
            WriteOutcome::Written
        };
        Box::pin(async move { Ok(outcome) })
    }
}
