//! Google Calendar adapter for calkeep.
//!
//! Provides the per-calendar adapter with its in-memory cache, the remote
//! service seam and its reqwest implementation.

pub mod adapter;
pub mod client;
pub mod error;
pub mod format;
pub mod remote;
pub mod types;

pub use adapter::{CalendarAdapter, EventFilters, LoadRange, UpdateOptions, CREATED_BY_DESCRIPTION};
pub use client::GoogleCalendarClient;
pub use error::{CalendarError, RemoteError};
pub use format::{format_event_summary, SummaryOptions};
pub use remote::{ListQuery, NewEvent, RemoteCalendar, UpdateMode};
pub use types::{Attendee, CalendarEvent, EventDateTime, Reminders};
