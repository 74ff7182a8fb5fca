//! Google Calendar API client.

use std::time::Duration;

use calkeep_auth::AccessToken;
use calkeep_core::GoogleConfig;
use tracing::instrument;

use crate::error::RemoteError;
use crate::remote::{format_timestamp, ListQuery, NewEvent, RemoteCalendar, UpdateMode};
use crate::types::{CalendarEvent, EventListResponse};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// reqwest implementation of [`RemoteCalendar`].
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_base_url(CALENDAR_API_BASE, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GoogleConfig) -> Result<Self, RemoteError> {
        Self::with_base_url(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id),
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id),
        )
    }

    /// Fetch one page of events.
    async fn list_page(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        query: &ListQuery,
        page_token: Option<&str>,
    ) -> Result<EventListResponse, RemoteError> {
        let mut url = format!(
            "{}?singleEvents={}&prettyPrint=false",
            self.events_url(calendar_id),
            query.single_events,
        );

        // startTime ordering is only accepted for expanded instances
        if query.single_events {
            push_param(&mut url, "orderBy", "startTime");
        }

        if let Some(show_deleted) = query.show_deleted {
            push_param(&mut url, "showDeleted", &show_deleted.to_string());
        }
        if let Some(time_min) = &query.time_min {
            push_param(&mut url, "timeMin", &format_timestamp(time_min));
        }
        if let Some(time_max) = &query.time_max {
            push_param(&mut url, "timeMax", &format_timestamp(time_max));
        }
        if let Some(q) = &query.text_search {
            push_param(&mut url, "q", q);
        }
        if let Some(max) = query.max_results {
            push_param(&mut url, "maxResults", &max.to_string());
        }
        if let Some(fields) = &query.fields {
            push_param(&mut url, "fields", &fields.join(","));
        }
        if let Some(token) = page_token {
            push_param(&mut url, "pageToken", token);
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(auth.secret())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| RemoteError::InvalidResponse(format!("JSON parse error: {}", e)))
        } else {
            Err(error_from_response(response).await)
        }
    }
}

impl RemoteCalendar for GoogleCalendarClient {
    #[instrument(skip(self, auth, event), level = "debug")]
    async fn insert(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<CalendarEvent, RemoteError> {
        let url = format!("{}?sendUpdates=all", self.events_url(calendar_id));

        let response = self
            .client
            .post(&url)
            .bearer_auth(auth.secret())
            .json(event)
            .send()
            .await?;

        self.handle_response(response).await
    }

    #[instrument(skip(self, auth), level = "debug")]
    async fn delete(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), RemoteError> {
        let url = format!("{}?sendUpdates=all", self.event_url(calendar_id, event_id));

        let response = self
            .client
            .delete(&url)
            .bearer_auth(auth.secret())
            .send()
            .await?;

        // Delete returns 204 No Content on success
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    #[instrument(skip(self, auth, resource), level = "debug")]
    async fn update(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event_id: &str,
        resource: &CalendarEvent,
        mode: UpdateMode,
        fields: Option<&[String]>,
    ) -> Result<CalendarEvent, RemoteError> {
        let mut url = format!(
            "{}?sendUpdates=all&prettyPrint=false",
            self.event_url(calendar_id, event_id)
        );
        if let Some(fields) = fields {
            push_param(&mut url, "fields", &fields.join(","));
        }

        let request = match mode {
            UpdateMode::Replace => self.client.put(&url),
            UpdateMode::Patch => self.client.patch(&url),
        };

        let response = request
            .bearer_auth(auth.secret())
            .json(resource)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Follows `nextPageToken` until the listing is exhausted or
    /// `max_results` events have been collected.
    #[instrument(skip(self, auth), level = "debug")]
    async fn list(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        query: &ListQuery,
    ) -> Result<Vec<CalendarEvent>, RemoteError> {
        let limit = query.max_results.map(|m| m as usize);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_page(auth, calendar_id, query, page_token.as_deref())
                .await?;
            events.extend(page.items);

            if let Some(limit) = limit {
                if events.len() >= limit {
                    events.truncate(limit);
                    break;
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Listed {} events from {}", events.len(), calendar_id);
        Ok(events)
    }
}

fn push_param(url: &mut String, key: &str, value: &str) {
    let separator = if url.contains('?') { '&' } else { '?' };
    url.push(separator);
    url.push_str(key);
    url.push('=');
    url.push_str(&urlencoding::encode(value));
}

async fn error_from_response(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    match status.as_u16() {
        401 => RemoteError::TokenExpired,
        403 => RemoteError::Forbidden(response.text().await.unwrap_or_default()),
        // 410 Gone: already deleted
        404 | 410 => RemoteError::NotFound(response.text().await.unwrap_or_default()),
        409 | 412 => RemoteError::Conflict,
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            RemoteError::RateLimited(retry_after)
        }
        code => RemoteError::Api {
            status: code,
            message: response.text().await.unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::EventDateTime;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{
        body_partial_json, header, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleCalendarClient {
        GoogleCalendarClient::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn token() -> AccessToken {
        AccessToken::new("test_token")
    }

    fn event_json(id: &str, summary: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "summary": summary,
            "start": {"dateTime": "2024-02-01T10:00:00Z"},
            "end": {"dateTime": "2024-02-01T11:00:00Z"}
        })
    }

    #[tokio::test]
    async fn test_insert_event() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(header("Authorization", "Bearer test_token"))
            .and(query_param("sendUpdates", "all"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Meeting",
                "description": "Created by test",
                "reminders": {"useDefault": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(event_json("new1", "Meeting")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let event = CalendarEvent::new(
            "Meeting",
            EventDateTime::at("2024-02-01T10:00:00Z"),
            EventDateTime::at("2024-02-01T11:00:00Z"),
        );
        let created = client(&mock_server)
            .insert(&token(), "primary", &NewEvent::from_event(&event, "Created by test"))
            .await
            .unwrap();

        assert_eq!(created.id.as_deref(), Some("new1"));
    }

    #[tokio::test]
    async fn test_list_events_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("orderBy", "startTime"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("showDeleted", "false"))
            .and(query_param("timeMin", "2024-02-01T00:00:00Z"))
            .and(query_param("timeMax", "2024-03-01T00:00:00Z"))
            .and(query_param("q", "team sync"))
            .and(query_param("fields", "items(id,summary),nextPageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [event_json("event1", "Meeting")]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let query = ListQuery {
            single_events: true,
            show_deleted: Some(false),
            time_min: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
            time_max: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            text_search: Some("team sync".to_string()),
            fields: Some(vec!["items(id,summary)".to_string(), "nextPageToken".to_string()]),
            ..ListQuery::default()
        };

        let events = client(&mock_server)
            .list(&token(), "primary", &query)
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("Meeting"));
    }

    #[tokio::test]
    async fn test_list_follows_pages() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [event_json("e1", "One"), event_json("e2", "Two")],
                "nextPageToken": "page2"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("pageToken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [event_json("e3", "Three")]
            })))
            .mount(&mock_server)
            .await;

        let events = client(&mock_server)
            .list(&token(), "primary", &ListQuery::default())
            .await
            .unwrap();

        let ids: Vec<_> = events.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
    }

    #[tokio::test]
    async fn test_list_stops_at_max_results() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("maxResults", "2"))
            .and(query_param("singleEvents", "false"))
            .and(query_param_is_missing("orderBy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [event_json("e1", "One"), event_json("e2", "Two")],
                "nextPageToken": "page2"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let query = ListQuery {
            max_results: Some(2),
            ..ListQuery::default()
        };
        let events = client(&mock_server)
            .list(&token(), "primary", &query)
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_update_uses_put_or_patch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/calendars/primary/events/event123"))
            .and(query_param("sendUpdates", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(event_json("event123", "Full")))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/calendars/primary/events/event123"))
            .and(query_param("fields", "id,summary"))
            .and(body_partial_json(serde_json::json!({"summary": "Patched"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "event123",
                "summary": "Patched"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let resource = CalendarEvent {
            summary: Some("Patched".to_string()),
            ..CalendarEvent::default()
        };

        let full = client
            .update(&token(), "primary", "event123", &resource, UpdateMode::Replace, None)
            .await
            .unwrap();
        assert_eq!(full.summary.as_deref(), Some("Full"));

        let fields = vec!["id".to_string(), "summary".to_string()];
        let patched = client
            .update(
                &token(),
                "primary",
                "event123",
                &resource,
                UpdateMode::Patch,
                Some(fields.as_slice()),
            )
            .await
            .unwrap();
        assert_eq!(patched.summary.as_deref(), Some("Patched"));
        assert!(patched.start.is_none());
    }

    #[tokio::test]
    async fn test_delete_event() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/event123"))
            .and(query_param("sendUpdates", "all"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .delete(&token(), "primary", "event123")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_gone_event() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/event123"))
            .respond_with(ResponseTemplate::new(410).set_body_string("Resource has been deleted"))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .delete(&token(), "primary", "event123")
            .await;

        assert!(matches!(result, Err(RemoteError::NotFound(msg)) if msg.contains("deleted")));
    }

    #[tokio::test]
    async fn test_token_expired() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .list(&token(), "primary", &ListQuery::default())
            .await;

        assert!(matches!(result, Err(RemoteError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "17"))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .list(&token(), "primary", &ListQuery::default())
            .await;

        assert!(matches!(result, Err(RemoteError::RateLimited(17))));
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .mount(&mock_server)
            .await;

        let event = CalendarEvent::new(
            "Meeting",
            EventDateTime::at("2024-02-01T10:00:00Z"),
            EventDateTime::at("2024-02-01T11:00:00Z"),
        );
        let result = client(&mock_server)
            .insert(&token(), "primary", &NewEvent::from_event(&event, "x"))
            .await;

        match result {
            Err(RemoteError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert!(message.contains("backend"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_calendar_id_is_encoded() {
        let client = GoogleCalendarClient::with_base_url("http://localhost/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.event_url("team#holiday@group.calendar.google.com", "ev 1"),
            "http://localhost/calendars/team%23holiday%40group.calendar.google.com/events/ev%201"
        );
    }
}
