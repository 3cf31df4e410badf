//! Human-readable differences between two snapshots.
//!
//! The diff is computed on semantic projections, so rotating map imagery
//! never shows up. It is only used for logging; whether to publish is
//! decided by [`EventSnapshot::semantically_eq`].

use std::collections::HashMap;
use std::fmt;

use crate::event::Event;
use crate::snapshot::EventSnapshot;

/// A single change between the published and the fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotChange {
    /// An event only present in the fresh snapshot.
    Added { id: u64, title: String },
    /// An event only present in the published snapshot.
    Removed { id: u64, title: String },
    /// An event present in both with differing fields.
    Modified {
        id: u64,
        title: String,
        fields: Vec<&'static str>,
    },
    /// Same events with the same content, in a different order.
    Reordered,
}

impl fmt::Display for SnapshotChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { id, title } => write!(f, "+ {} \"{}\"", id, title),
            Self::Removed { id, title } => write!(f, "- {} \"{}\"", id, title),
            Self::Modified { id, title, fields } => {
                write!(f, "~ {} \"{}\": {} changed", id, title, fields.join(", "))
            }
            Self::Reordered => write!(f, "event order changed"),
        }
    }
}

/// Lists the publish-relevant changes from `published` to `fresh`.
///
/// Added and modified events follow the fresh order, removed events follow
/// the published order. Returns an empty list when the snapshots are
/// semantically equal.
pub fn diff_snapshots(published: &EventSnapshot, fresh: &EventSnapshot) -> Vec<SnapshotChange> {
    let old = published.semantic_projection();
    let new = fresh.semantic_projection();

    let old_by_id: HashMap<u64, &Event> = old.iter().map(|e| (e.id, e)).collect();
    let new_by_id: HashMap<u64, &Event> = new.iter().map(|e| (e.id, e)).collect();

    let mut changes = Vec::new();

    for event in &new {
        match old_by_id.get(&event.id) {
            None => changes.push(SnapshotChange::Added {
                id: event.id,
                title: event.title.clone(),
            }),
            Some(previous) => {
                let fields = changed_fields(previous, event);
                if !fields.is_empty() {
                    changes.push(SnapshotChange::Modified {
                        id: event.id,
                        title: event.title.clone(),
                        fields,
                    });
                }
            }
        }
    }

    for event in &old {
        if !new_by_id.contains_key(&event.id) {
            changes.push(SnapshotChange::Removed {
                id: event.id,
                title: event.title.clone(),
            });
        }
    }

    // Same id set and content but unequal sequences: order (or duplicates) moved.
    if changes.is_empty() && old != new {
        changes.push(SnapshotChange::Reordered);
    }

    changes
}

/// Names the projected fields that differ between two versions of an event.
fn changed_fields(old: &Event, new: &Event) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if old.title != new.title {
        fields.push("title");
    }
    if old.description != new.description {
        fields.push("description");
    }
    if old.address != new.address {
        fields.push("address");
    }
    if old.women_only != new.women_only {
        fields.push("women_only");
    }
    if old.occurrences != new.occurrences {
        fields.push("upcoming_occurrences");
    }
    fields
}
