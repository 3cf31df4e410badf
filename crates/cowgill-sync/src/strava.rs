//! Club event listing from the fitness platform.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cowgill_core::{Event, EventSnapshot};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::http::{self, BoxFuture};

/// A source of club events.
pub trait EventSource: Send + Sync {
    /// Lists every club event, as returned upstream.
    fn list_events<'a>(&'a self, access_token: &'a str) -> BoxFuture<'a, SyncResult<Vec<Event>>>;
}

/// Fetches the events with at least one occurrence strictly after `now`.
///
/// Kept events are returned whole and in upstream order.
pub async fn fetch_upcoming(
    source: &dyn EventSource,
    access_token: &str,
    now: DateTime<Utc>,
) -> SyncResult<EventSnapshot> {
    let events = source.list_events(access_token).await?;
    let total = events.len();
    let snapshot = EventSnapshot::upcoming(events, now);
    info!(
        total,
        upcoming = snapshot.len(),
        "retrieved upcoming club events"
    );
    Ok(snapshot)
}

/// Group events of one club on the platform API.
#[derive(Debug)]
pub struct StravaClub {
    events_url: String,
    http_client: reqwest::Client,
}

impl StravaClub {
    /// Creates a source for `{api_base}/clubs/{club_id}/group_events`.
    pub fn new(api_base: &str, club_id: u64, timeout: Duration) -> SyncResult<Self> {
        Ok(Self {
            events_url: format!(
                "{}/clubs/{}/group_events",
                api_base.trim_end_matches('/'),
                club_id
            ),
            http_client: http::build_client(timeout, SyncError::upstream)?,
        })
    }

    /// Fetches upcoming events as of the current wall-clock time.
    pub async fn fetch(&self, access_token: &str) -> SyncResult<EventSnapshot> {
        fetch_upcoming(self, access_token, Utc::now()).await
    }

    async fn get_events(&self, access_token: &str) -> SyncResult<Vec<Event>> {
        debug!(url = %self.events_url, "fetching club events");

        let response = self
            .http_client
            .get(&self.events_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::upstream(format!("events {}", http::describe(&e))))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::upstream(format!("failed to read events response: {}", e)))?;

        if status != StatusCode::OK {
            return Err(SyncError::upstream(format!(
                "events request failed ({}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| SyncError::upstream(format!("failed to parse events: {}", e)).with_source(e))
    }
}

impl EventSource for StravaClub {
    fn list_events<'a>(&'a self, access_token: &'a str) -> BoxFuture<'a, SyncResult<Vec<Event>>> {
        Box::pin(self.get_events(access_token))
    }
}
