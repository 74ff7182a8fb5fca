//! Per-calendar adapter with an in-memory event cache.
//!
//! Every remote operation follows the same shape: authorize, issue one
//! remote call, then update the cache (create and load only) and return.
//! The cache is append-only: deletes and updates never touch it, and the
//! same event loaded twice is cached twice.

use calkeep_auth::{AccessToken, Authorizer};
use calkeep_core::CalendarConfig;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::CalendarError;
use crate::format::{format_event_summary, SummaryOptions};
use crate::remote::{format_timestamp, ListQuery, NewEvent, RemoteCalendar, UpdateMode};
use crate::types::CalendarEvent;

/// Description attached to every event created through the adapter.
pub const CREATED_BY_DESCRIPTION: &str = "Created by calkeep";

/// Optional filters for [`CalendarAdapter::list_remote_events`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilters {
    pub max_results: Option<u32>,
    pub fields: Option<Vec<String>>,
    pub text_search: Option<String>,
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
}

/// Window for [`CalendarAdapter::load_events_into_cache`]. Both bounds are
/// required; they are optional here so a missing one is reported as an
/// error rather than a type mismatch at the call site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadRange {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub text_search: Option<String>,
}

impl LoadRange {
    pub fn new(time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        Self {
            time_min: Some(time_min),
            time_max: Some(time_max),
            text_search: None,
        }
    }

    pub fn with_text_search(mut self, text: impl Into<String>) -> Self {
        self.text_search = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Patch only the fields present in the resource instead of replacing it
    pub patch_only: bool,
    /// Limit the fields returned by the service
    pub fields: Option<Vec<String>>,
}

pub struct CalendarAdapter<A, R> {
    name: String,
    calendar_id: String,
    cached_events: Vec<CalendarEvent>,
    authorizer: A,
    remote: R,
}

impl<A, R> CalendarAdapter<A, R>
where
    A: Authorizer,
    R: RemoteCalendar,
{
    /// Create an adapter for one remote calendar.
    ///
    /// # Errors
    /// `MissingCalendarId` if `calendar_id` is empty.
    pub fn new(
        name: impl Into<String>,
        calendar_id: impl Into<String>,
        authorizer: A,
        remote: R,
    ) -> Result<Self, CalendarError> {
        let calendar_id = calendar_id.into();
        if calendar_id.trim().is_empty() {
            return Err(CalendarError::MissingCalendarId);
        }

        Ok(Self {
            name: name.into(),
            calendar_id,
            cached_events: Vec::new(),
            authorizer,
            remote,
        })
    }

    pub fn from_config(
        config: &CalendarConfig,
        authorizer: A,
        remote: R,
    ) -> Result<Self, CalendarError> {
        let calendar_id = config
            .calendar_id
            .clone()
            .ok_or(CalendarError::MissingCalendarId)?;
        Self::new(config.name.clone(), calendar_id, authorizer, remote)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Cached events in the order they were added.
    pub fn events(&self) -> &[CalendarEvent] {
        &self.cached_events
    }

    pub fn add_event(&mut self, event: CalendarEvent) {
        self.cached_events.push(event);
    }

    pub fn event_summary(
        &self,
        event: &CalendarEvent,
        options: SummaryOptions,
    ) -> Result<String, CalendarError> {
        format_event_summary(event, options)
    }

    async fn authorize(&self) -> Result<AccessToken, CalendarError> {
        self.authorizer.authorize().await.map_err(|e| {
            tracing::error!("Authorization failed: {}", e);
            CalendarError::Authorization(e)
        })
    }

    /// Insert `event` remotely and cache the resource the service returns.
    #[instrument(skip_all, fields(calendar = %self.name))]
    pub async fn create_remote_event(
        &mut self,
        event: &CalendarEvent,
    ) -> Result<CalendarEvent, CalendarError> {
        tracing::info!("Adding event to calendar: {}", describe(event));

        let auth = self.authorize().await?;
        let body = NewEvent::from_event(event, CREATED_BY_DESCRIPTION);

        let created = self
            .remote
            .insert(&auth, &self.calendar_id, &body)
            .await
            .map_err(|e| {
                tracing::error!("Failed to add event to calendar: {}", e);
                CalendarError::Remote(e)
            })?;

        tracing::info!("Created event: {}", describe(&created));
        tracing::debug!("Returned event resource: {:?}", created);

        self.add_event(created.clone());
        Ok(created)
    }

    /// Delete `event` remotely. The cache is left as is.
    #[instrument(skip_all, fields(calendar = %self.name))]
    pub async fn delete_remote_event(&self, event: &CalendarEvent) -> Result<(), CalendarError> {
        let event_id = event.id.as_deref().ok_or_else(|| {
            CalendarError::InvalidArgument("cannot delete an event without an id".to_string())
        })?;

        tracing::info!("Deleting event {}", describe(event));

        let auth = self.authorize().await?;
        self.remote
            .delete(&auth, &self.calendar_id, event_id)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete event: {}", e);
                CalendarError::Remote(e)
            })?;

        tracing::info!("+---> Deleted event {}", describe(event));
        Ok(())
    }

    /// Query the remote calendar without touching the cache.
    #[instrument(skip_all, fields(calendar = %self.name))]
    pub async fn list_remote_events(
        &self,
        filters: &EventFilters,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let auth = self.authorize().await?;

        let query = ListQuery {
            single_events: true,
            show_deleted: None,
            time_min: filters.time_min,
            time_max: filters.time_max,
            text_search: filters.text_search.clone(),
            max_results: filters.max_results,
            fields: filters.fields.clone(),
        };

        let events = self
            .remote
            .list(&auth, &self.calendar_id, &query)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list events: {}", e);
                CalendarError::Remote(e)
            })?;
        tracing::debug!("Listed {} events", events.len());
        Ok(events)
    }

    /// Load `[time_min, time_max)` into the cache and return the whole batch.
    ///
    /// Events that cannot be rendered are logged and left out of the cache
    /// but are still part of the returned batch.
    ///
    /// # Errors
    /// `InvalidArgument` if either bound is missing; the authorizer is not
    /// consulted in that case.
    #[instrument(skip_all, fields(calendar = %self.name))]
    pub async fn load_events_into_cache(
        &mut self,
        range: &LoadRange,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let time_min = range.time_min.ok_or_else(|| {
            CalendarError::InvalidArgument("load_events_into_cache: no start time specified".to_string())
        })?;
        let time_max = range.time_max.ok_or_else(|| {
            CalendarError::InvalidArgument("load_events_into_cache: no end time specified".to_string())
        })?;

        tracing::info!("Loading events in calendar: {}", self.name);
        let auth = self.authorize().await?;
        tracing::debug!(
            "Period: {} to {}",
            format_timestamp(&time_min),
            format_timestamp(&time_max)
        );

        let query = ListQuery {
            single_events: true,
            show_deleted: Some(false),
            time_min: Some(time_min),
            time_max: Some(time_max),
            text_search: range.text_search.clone(),
            ..ListQuery::default()
        };

        let events = self
            .remote
            .list(&auth, &self.calendar_id, &query)
            .await
            .map_err(|e| {
                tracing::error!("The API returned an error: {}", e);
                CalendarError::Remote(e)
            })?;

        if events.is_empty() {
            tracing::info!("No calendar entries found.");
        }

        for event in &events {
            match format_event_summary(event, SummaryOptions::default()) {
                Ok(line) => {
                    tracing::info!("+-> {}", line);
                    self.add_event(event.clone());
                }
                Err(e) => {
                    tracing::error!("Could not add event: {}", e);
                    tracing::error!("Raw resource is: {:?}", event);
                }
            }
        }

        Ok(events)
    }

    /// Replace or patch an event remotely. The cache is left as is.
    #[instrument(skip_all, fields(calendar = %self.name, event_id = %event_id))]
    pub async fn update_remote_event(
        &self,
        event_id: &str,
        resource: &CalendarEvent,
        options: &UpdateOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        let mode = if options.patch_only {
            UpdateMode::Patch
        } else {
            UpdateMode::Replace
        };

        let auth = self.authorize().await?;
        let updated = self
            .remote
            .update(
                &auth,
                &self.calendar_id,
                event_id,
                resource,
                mode,
                options.fields.as_deref(),
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to update event: {}", e);
                CalendarError::Remote(e)
            })?;

        tracing::debug!("Returned event resource: {:?}", updated);
        Ok(updated)
    }
}

/// Summary for log lines; never fails.
fn describe(event: &CalendarEvent) -> String {
    format_event_summary(event, SummaryOptions::default())
        .unwrap_or_else(|e| format!("<unformattable event: {}>", e))
}
