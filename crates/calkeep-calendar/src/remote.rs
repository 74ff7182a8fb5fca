//! The remote calendar service seam.

use calkeep_auth::AccessToken;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::RemoteError;
use crate::types::{Attendee, CalendarEvent, EventDateTime, Reminders};

/// Parameters of an event list call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Expand recurring events into instances, ordered by start time
    pub single_events: bool,
    pub show_deleted: Option<bool>,
    /// Inclusive lower bound on event end
    pub time_min: Option<DateTime<Utc>>,
    /// Exclusive upper bound on event start
    pub time_max: Option<DateTime<Utc>>,
    pub text_search: Option<String>,
    pub max_results: Option<u32>,
    /// Partial response selector, joined with `,`
    pub fields: Option<Vec<String>>,
}

/// Full replace or partial patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Replace,
    Patch,
}

/// Body of an insert call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    pub reminders: Reminders,
}

impl NewEvent {
    /// Take the insertable fields of `event`; reminders fall back to the
    /// calendar defaults.
    pub fn from_event(event: &CalendarEvent, description: &str) -> Self {
        Self {
            summary: event.summary.clone(),
            description: description.to_string(),
            start: event.start.clone(),
            end: event.end.clone(),
            attendees: event.attendees.clone(),
            reminders: Reminders::default_only(),
        }
    }
}

/// Normalize a bound to the API's timestamp format.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Remote calendar operations, all notifying attendees where applicable.
pub trait RemoteCalendar {
    async fn insert(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<CalendarEvent, RemoteError>;

    async fn delete(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), RemoteError>;

    async fn update(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event_id: &str,
        resource: &CalendarEvent,
        mode: UpdateMode,
        fields: Option<&[String]>,
    ) -> Result<CalendarEvent, RemoteError>;

    async fn list(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        query: &ListQuery,
    ) -> Result<Vec<CalendarEvent>, RemoteError>;
}
