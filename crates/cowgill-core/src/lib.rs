//! Core types: club events, snapshots, semantic diff, tracing

pub mod diff;
pub mod event;
pub mod snapshot;
pub mod tracing;

pub use diff::{SnapshotChange, diff_snapshots};
pub use event::{Event, MapUrls, Occurrence, RouteSummary, filter_upcoming};
pub use snapshot::{EventSnapshot, SnapshotError};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
