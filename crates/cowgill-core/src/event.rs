//! Club event types.
//!
//! This module provides the types published to the website listing:
//! - [`Event`]: A club group event as returned by the platform
//! - [`Occurrence`]: One scheduled instance of an event
//! - [`RouteSummary`]: Route metadata attached to an event (volatile map imagery)
//!
//! The serde layout mirrors the platform's JSON so that the published file
//! can be read back with the same types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled instance of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Occurrence(pub DateTime<Utc>);

impl Occurrence {
    /// Creates an occurrence at the given instant.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Returns the instant of this occurrence.
    pub fn at(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns true if this occurrence is strictly later than `now`.
    pub fn is_after(&self, now: DateTime<Utc>) -> bool {
        self.0 > now
    }
}

impl From<DateTime<Utc>> for Occurrence {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M UTC"))
    }
}

/// Rendered map images for a route.
///
/// The platform rotates these URLs (signed CDN links), so they change
/// between fetches even when the route itself has not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapUrls {
    #[serde(default)]
    pub light_url: String,
    #[serde(default)]
    pub dark_url: String,
}

/// Route metadata attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    #[serde(default)]
    pub map_urls: MapUrls,
}

/// A club group event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Platform identifier of the event.
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub women_only: bool,
    /// Scheduled instances, as listed by the platform (may include past ones).
    #[serde(default, rename = "upcoming_occurrences")]
    pub occurrences: Vec<Occurrence>,
    /// Route metadata, absent for events without a planned route.
    #[serde(default, rename = "route")]
    pub route_summary: Option<RouteSummary>,
}

impl Event {
    /// Creates an event with the given id and title and no other details.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            address: String::new(),
            women_only: false,
            occurrences: Vec::new(),
            route_summary: None,
        }
    }

    /// Builder method to add an occurrence.
    pub fn with_occurrence(mut self, at: DateTime<Utc>) -> Self {
        self.occurrences.push(Occurrence(at));
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Builder method to set the route map images.
    pub fn with_map_urls(mut self, light_url: impl Into<String>, dark_url: impl Into<String>) -> Self {
        self.route_summary = Some(RouteSummary {
            map_urls: MapUrls {
                light_url: light_url.into(),
                dark_url: dark_url.into(),
            },
        });
        self
    }

    /// Returns true if at least one occurrence is strictly later than `now`.
    ///
    /// An event without occurrences never qualifies.
    pub fn has_future_occurrence(&self, now: DateTime<Utc>) -> bool {
        self.occurrences.iter().any(|o| o.is_after(now))
    }

    /// Returns the earliest occurrence strictly later than `now`.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Option<Occurrence> {
        self.occurrences
            .iter()
            .copied()
            .filter(|o| o.is_after(now))
            .min()
    }

    /// Returns the publish-relevant projection of this event.
    ///
    /// The route summary only carries rotating map imagery, so it is masked
    /// out entirely. Every other field is kept as-is.
    pub fn semantic_projection(&self) -> Event {
        Event {
            route_summary: None,
            ..self.clone()
        }
    }

    /// Returns true if both events are equal once volatile fields are masked.
    pub fn semantically_eq(&self, other: &Event) -> bool {
        self.semantic_projection() == other.semantic_projection()
    }
}

/// Keeps the events that have at least one occurrence strictly after `now`.
///
/// Kept events are returned whole (past occurrences included) and in their
/// original order.
pub fn filter_upcoming(events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| event.has_future_occurrence(now))
        .collect()
}
