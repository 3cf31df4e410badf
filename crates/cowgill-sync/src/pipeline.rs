//! The per-run driver.
//!
//! A run walks a fixed sequence of states, each depending on the previous
//! step's output:
//!
//! ```text
//! idle -> credentials_refreshed -> secret_checked -> events_fetched
//!      -> up_to_date | published -> done
//! ```
//!
//! Any error aborts the run with the failing [`Step`] attached.
//! Nothing is resumed across runs.

use std::fmt;

use chrono::{DateTime, Utc};
use cowgill_core::EventSnapshot;
use tracing::{debug, info};

use crate::content::{ContentSynchronizer, SyncOutcome};
use crate::error::SyncResult;
use crate::oauth::TokenExchange;
use crate::strava::{self, EventSource};
use crate::vault::{SecretOutcome, SecretPublisher};

/// Pipeline state within a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    CredentialsRefreshed,
    SecretChecked,
    EventsFetched,
    UpToDate,
    Published,
    Done,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CredentialsRefreshed => "credentials_refreshed",
            Self::SecretChecked => "secret_checked",
            Self::EventsFetched => "events_fetched",
            Self::UpToDate => "up_to_date",
            Self::Published => "published",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The step a run was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RefreshCredentials,
    PublishSecret,
    FetchEvents,
    Synchronize,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshCredentials => "refresh_credentials",
            Self::PublishSecret => "publish_secret",
            Self::FetchEvents => "fetch_events",
            Self::Synchronize => "synchronize",
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub secret: SecretOutcome,
    pub content: SyncOutcome,
    /// The upcoming events as fetched this run.
    pub events: EventSnapshot,
}

impl RunReport {
    /// Returns true if the run wrote to the vault or the repository.
    pub fn changed_anything(&self) -> bool {
        !matches!(self.secret, SecretOutcome::UpToDate)
            || !matches!(self.content, SyncOutcome::UpToDate)
    }
}

/// Rotates the credential and republishes upcoming events.
pub struct Pipeline {
    exchange: Box<dyn TokenExchange>,
    publisher: SecretPublisher,
    source: Box<dyn EventSource>,
    synchronizer: ContentSynchronizer,
    refresh_token: String,
}

impl Pipeline {
    /// Creates a pipeline starting from the currently stored `refresh_token`.
    pub fn new(
        exchange: Box<dyn TokenExchange>,
        publisher: SecretPublisher,
        source: Box<dyn EventSource>,
        synchronizer: ContentSynchronizer,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            exchange,
            publisher,
            source,
            synchronizer,
            refresh_token: refresh_token.into(),
        }
    }

    /// Runs once, filtering events against the time of the fetch.
    pub async fn run(&self) -> SyncResult<RunReport> {
        self.run_with_clock(Utc::now).await
    }

    /// Runs once, keeping events with an occurrence strictly after `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> SyncResult<RunReport> {
        self.run_with_clock(|| now).await
    }

    async fn run_with_clock<C>(&self, clock: C) -> SyncResult<RunReport>
    where
        C: Fn() -> DateTime<Utc>,
    {
        let mut state = RunState::Idle;
        debug!(
            %state,
            secret = self.publisher.secret_name(),
            path = self.synchronizer.path(),
            "starting run"
        );

        let credential = self
            .exchange
            .refresh(&self.refresh_token)
            .await
            .map_err(|e| e.with_step(Step::RefreshCredentials.as_str()))?;
        state = transition(state, RunState::CredentialsRefreshed);

        let secret = self
            .publisher
            .publish(&credential.refresh_token, &self.refresh_token)
            .await
            .map_err(|e| e.with_step(Step::PublishSecret.as_str()))?;
        state = transition(state, RunState::SecretChecked);

        let now = clock();
        let events = strava::fetch_upcoming(self.source.as_ref(), &credential.access_token, now)
            .await
            .map_err(|e| e.with_step(Step::FetchEvents.as_str()))?;
        state = transition(state, RunState::EventsFetched);

        let content = self
            .synchronizer
            .sync(&events)
            .await
            .map_err(|e| e.with_step(Step::Synchronize.as_str()))?;
        state = match content {
            SyncOutcome::UpToDate => transition(state, RunState::UpToDate),
            SyncOutcome::Published { .. } => transition(state, RunState::Published),
        };
        transition(state, RunState::Done);

        let report = RunReport {
            secret,
            content,
            events,
        };
        info!(
            events = report.events.len(),
            changed = report.changed_anything(),
            "run complete"
        );
        Ok(report)
    }
}

fn transition(from: RunState, to: RunState) -> RunState {
    debug!(%from, %to, "state transition");
    to
}
