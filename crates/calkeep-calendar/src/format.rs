//! One-line event summaries for logs and terminal output.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::CalendarError;
use crate::types::{CalendarEvent, EventDateTime};

/// Shown in place of a missing id or timezone.
pub const PLACEHOLDER: &str = "--";

const SHORT_ID_LEN: usize = 8;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryOptions {
    pub show_time_zones: bool,
}

impl SummaryOptions {
    pub fn with_time_zones() -> Self {
        Self {
            show_time_zones: true,
        }
    }
}

/// Render `event` as
/// `"<summary>" (<id tail>) <start>[(<tz>)] -> <end>[(<tz>)]`.
///
/// Times are shown in the offset they were written with; a `dateTime`
/// without an offset (zone given by `timeZone`) is shown as written.
/// Missing attendees, summary or timezone never cause an error; a missing
/// or unparseable start/end does.
pub fn format_event_summary(
    event: &CalendarEvent,
    options: SummaryOptions,
) -> Result<String, CalendarError> {
    let start = event
        .start
        .as_ref()
        .ok_or_else(|| CalendarError::EventFormatting("event has no start".to_string()))?;
    let end = event
        .end
        .as_ref()
        .ok_or_else(|| CalendarError::EventFormatting("event has no end".to_string()))?;

    let mut line = format!(
        "\"{}\" ({}) {}",
        event.summary.as_deref().unwrap_or_default(),
        short_id(event.id.as_deref()),
        render_time(start)?
    );
    if options.show_time_zones {
        line.push_str(&time_zone_suffix(start));
    }
    line.push_str(" -> ");
    line.push_str(&render_time(end)?);
    if options.show_time_zones {
        line.push_str(&time_zone_suffix(end));
    }

    Ok(line)
}

/// Last eight characters of the id, or the placeholder.
fn short_id(id: Option<&str>) -> &str {
    match id {
        Some(id) => {
            let skip = id.chars().count().saturating_sub(SHORT_ID_LEN);
            id.char_indices()
                .nth(skip)
                .map_or(id, |(offset, _)| &id[offset..])
        }
        None => PLACEHOLDER,
    }
}

fn render_time(time: &EventDateTime) -> Result<String, CalendarError> {
    if let Some(raw) = &time.date_time {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Ok(parsed.format(TIME_FORMAT).to_string());
        }
        let local = NaiveDateTime::parse_from_str(raw, LOCAL_DATE_TIME_FORMAT).map_err(|e| {
            CalendarError::EventFormatting(format!("invalid dateTime '{}': {}", raw, e))
        })?;
        return Ok(local.format(TIME_FORMAT).to_string());
    }
    if let Some(raw) = &time.date {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
            CalendarError::EventFormatting(format!("invalid date '{}': {}", raw, e))
        })?;
        return Ok(format!("{} 00:00", date.format("%Y-%m-%d")));
    }
    Err(CalendarError::EventFormatting(
        "time has neither dateTime nor date".to_string(),
    ))
}

fn time_zone_suffix(time: &EventDateTime) -> String {
    format!("({})", time.time_zone.as_deref().unwrap_or(PLACEHOLDER))
}
