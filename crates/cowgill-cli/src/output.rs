//! Rendering of the final event set on stdout.

use chrono::{DateTime, Utc};
use cowgill_core::{Event, EventSnapshot};

use crate::cli::OutputFormat;
use crate::error::CliResult;

const NO_EVENTS_TEXT: &str = "No upcoming events";

/// Renders `events` in `format` as of the current time.
pub fn render(events: &EventSnapshot, format: OutputFormat) -> CliResult<String> {
    render_at(events, format, Utc::now())
}

/// Renders `events` in `format`, taking "next occurrence" relative to `now`.
pub fn render_at(
    events: &EventSnapshot,
    format: OutputFormat,
    now: DateTime<Utc>,
) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text_at(events, now)),
        OutputFormat::Json => Ok(events.to_canonical_json()?),
    }
}

fn render_text_at(events: &EventSnapshot, now: DateTime<Utc>) -> String {
    if events.is_empty() {
        return format!("{}\n", NO_EVENTS_TEXT);
    }
    events
        .events()
        .iter()
        .map(|event| format!("{}\n", event_line(event, now)))
        .collect()
}

fn event_line(event: &Event, now: DateTime<Utc>) -> String {
    let when = event
        .next_occurrence(now)
        .map(|occurrence| occurrence.to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut line = format!("{}  {}", when, event.title);
    if !event.address.is_empty() {
        line.push_str(&format!(" @ {}", event.address));
    }
    if event.women_only {
        line.push_str(" [women only]");
    }
    line
}
