//! Credential rotation and diff-gated event publishing.
//!
//! One run of the job:
//!
//! ```text
//! ┌──────────────┐ refresh token  ┌──────────────────┐
//! │ OAuthClient  │───────────────▶│ SecretPublisher  │──▶ Actions secret
//! └──────┬───────┘   (if changed) └──────────────────┘
//!        │ access token
//!        ▼
//! ┌──────────────┐ EventSnapshot  ┌──────────────────────┐
//! │ StravaClub   │───────────────▶│ ContentSynchronizer  │──▶ repo file
//! └──────────────┘  (upcoming)    └──────────────────────┘
//! ```
//!
//! Each box is a trait at the seam ([`TokenExchange`], [`SecretVault`],
//! [`EventSource`], [`ContentStore`]) so [`Pipeline`] can be driven by
//! in-memory fakes.
//!
//! # Example
//!
//! ```ignore
//! use cowgill_sync::{OAuthClient, Pipeline, SecretPublisher, StravaClub};
//!
//! let report = pipeline.run().await?;
//! for event in report.events.events() {
//!     println!("{}", event.title);
//! }
//! ```

pub mod content;
pub mod error;
pub mod github;
pub mod http;
pub mod oauth;
pub mod pipeline;
pub mod seal;
pub mod strava;
pub mod vault;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use content::{
    ContentStore, ContentSynchronizer, GithubContents, RemoteFile, SyncOutcome, WriteOutcome,
};
pub use error::{SyncError, SyncErrorKind, SyncResult};
pub use github::{GITHUB_API_BASE, GithubRepo};
pub use http::{BoxFuture, DEFAULT_TIMEOUT, fingerprint};
pub use oauth::{ClientCredentials, Credential, OAuthClient, STRAVA_API_BASE, TokenExchange};
pub use pipeline::{Pipeline, RunReport, RunState, Step};
pub use strava::{EventSource, StravaClub, fetch_upcoming};
pub use vault::{
    GithubActionsVault, PublicKeyMaterial, SealedSecret, SecretOutcome, SecretPublisher,
    SecretVault,
};
