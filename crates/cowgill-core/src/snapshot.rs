//! The published event listing.
//!
//! An [`EventSnapshot`] is the full content of the listing file. It has a
//! single canonical storage form: pretty-printed JSON (two-space indent,
//! fields in declaration order, trailing newline), carried as standard
//! base64 by the content repository.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{Event, filter_upcoming};

/// Errors produced while decoding or encoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The stored bytes are not valid base64.
    #[error("invalid storage encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The decoded bytes are not UTF-8.
    #[error("snapshot is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The JSON does not describe a list of events.
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// An ordered list of events, as published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSnapshot(Vec<Event>);

impl EventSnapshot {
    /// Creates a snapshot from events, keeping their order.
    pub fn new(events: Vec<Event>) -> Self {
        Self(events)
    }

    /// Builds the snapshot of events with at least one occurrence after `now`.
    pub fn upcoming(events: Vec<Event>, now: DateTime<Utc>) -> Self {
        Self(filter_upcoming(events, now))
    }

    pub fn events(&self) -> &[Event] {
        &self.0
    }

    pub fn into_events(self) -> Vec<Event> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the publish-relevant projection of every event, in order.
    pub fn semantic_projection(&self) -> Vec<Event> {
        self.0.iter().map(Event::semantic_projection).collect()
    }

    /// Returns true if both snapshots hold the same events in the same
    /// order once volatile fields are masked.
    pub fn semantically_eq(&self, other: &EventSnapshot) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| a.semantically_eq(b))
    }

    /// Serializes to the canonical JSON document.
    pub fn to_canonical_json(&self) -> Result<String, SnapshotError> {
        let mut json = serde_json::to_string_pretty(&self.0)?;
        json.push('\n');
        Ok(json)
    }

    /// Parses a JSON document into a snapshot.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(Self(serde_json::from_str(json)?))
    }

    /// Encodes the canonical JSON for storage.
    pub fn to_storage(&self) -> Result<String, SnapshotError> {
        Ok(STANDARD.encode(self.to_canonical_json()?))
    }

    /// Decodes a stored body and parses it.
    ///
    /// Line breaks inside the encoded body are ignored; the content API
    /// wraps base64 at 60 columns.
    pub fn from_storage(encoded: &str) -> Result<Self, SnapshotError> {
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD.decode(compact)?;
        let json = String::from_utf8(bytes)?;
        Self::from_json(&json)
    }
}

impl From<Vec<Event>> for EventSnapshot {
    fn from(events: Vec<Event>) -> Self {
        Self(events)
    }
}

impl<'a> IntoIterator for &'a EventSnapshot {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
