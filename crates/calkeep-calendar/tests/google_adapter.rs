//! End-to-end tests of CalendarAdapter over GoogleCalendarClient using wiremock.

use std::time::Duration;

use calkeep_auth::StaticTokenAuthorizer;
use calkeep_calendar::{
    format_event_summary, CalendarAdapter, CalendarError, CalendarEvent, EventDateTime,
    EventFilters, GoogleCalendarClient, LoadRange, RemoteError, SummaryOptions, UpdateOptions,
    CREATED_BY_DESCRIPTION,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Adapter = CalendarAdapter<StaticTokenAuthorizer, GoogleCalendarClient>;

fn adapter(server: &MockServer) -> Adapter {
    let client = GoogleCalendarClient::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap();
    CalendarAdapter::new("Work", "primary", StaticTokenAuthorizer::new("test_token"), client).unwrap()
}

fn standup() -> CalendarEvent {
    CalendarEvent::new(
        "Standup",
        EventDateTime::at("2024-01-02T09:00:00Z"),
        EventDateTime::at("2024-01-02T09:15:00Z"),
    )
}

#[tokio::test]
async fn test_create_standup_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("Authorization", "Bearer test_token"))
        .and(query_param("sendUpdates", "all"))
        .and(body_partial_json(json!({
            "summary": "Standup",
            "description": CREATED_BY_DESCRIPTION,
            "reminders": {"useDefault": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abcdEFGH12345678",
            "summary": "Standup",
            "description": CREATED_BY_DESCRIPTION,
            "start": {"dateTime": "2024-01-02T09:00:00Z"},
            "end": {"dateTime": "2024-01-02T09:15:00Z"},
            "htmlLink": "https://calendar.google.com/event?eid=abc"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut adapter = adapter(&mock_server);
    let created = adapter.create_remote_event(&standup()).await.unwrap();

    assert_eq!(adapter.events().len(), 1);
    assert_eq!(adapter.events()[0], created);
    assert_eq!(created.extra["htmlLink"], "https://calendar.google.com/event?eid=abc");
    assert_eq!(
        format_event_summary(&adapter.events()[0], SummaryOptions::default()).unwrap(),
        r#""Standup" (12345678) 2024-01-02 09:00 -> 2024-01-02 09:15"#
    );
}

#[tokio::test]
async fn test_create_rejected_by_api_leaves_cache_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient permissions"))
        .mount(&mock_server)
        .await;

    let mut adapter = adapter(&mock_server);
    let result = adapter.create_remote_event(&standup()).await;

    assert!(matches!(
        result,
        Err(CalendarError::Remote(RemoteError::Forbidden(_)))
    ));
    assert!(adapter.events().is_empty());
}

#[tokio::test]
async fn test_load_then_delete_keeps_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("showDeleted", "false"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .and(query_param("timeMin", "2024-01-01T00:00:00Z"))
        .and(query_param("timeMax", "2024-01-08T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "evt-one-0000001",
                    "summary": "Planning",
                    "start": {"dateTime": "2024-01-02T10:00:00Z"},
                    "end": {"dateTime": "2024-01-02T11:00:00Z"}
                },
                {
                    "id": "evt-cancelled",
                    "status": "cancelled"
                },
                {
                    "id": "evt-two-0000002",
                    "summary": "Offsite",
                    "start": {"date": "2024-01-05"},
                    "end": {"date": "2024-01-06"}
                }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/calendars/primary/events/evt-one-0000001"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut adapter = adapter(&mock_server);
    let range = LoadRange::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap(),
    );

    let batch = adapter.load_events_into_cache(&range).await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(adapter.events().len(), 2);

    let first = adapter.events()[0].clone();
    adapter.delete_remote_event(&first).await.unwrap();

    assert_eq!(adapter.events().len(), 2);
    assert_eq!(adapter.events()[0], first);
}

#[tokio::test]
async fn test_list_with_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("q", "retro"))
        .and(query_param("maxResults", "5"))
        .and(query_param("fields", "items(id,summary)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "r1", "summary": "Retro"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let adapter = adapter(&mock_server);
    let filters = EventFilters {
        max_results: Some(5),
        fields: Some(vec!["items(id,summary)".to_string()]),
        text_search: Some("retro".to_string()),
        ..EventFilters::default()
    };

    let events = adapter.list_remote_events(&filters).await.unwrap();

    assert_eq!(events.len(), 1);
    assert!(adapter.events().is_empty());
}

#[tokio::test]
async fn test_patch_update() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/calendars/primary/events/ev1"))
        .and(body_partial_json(json!({"summary": "Moved"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ev1",
            "summary": "Moved",
            "start": {"dateTime": "2024-01-02T10:00:00Z"},
            "end": {"dateTime": "2024-01-02T10:15:00Z"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let adapter = adapter(&mock_server);
    let patch = CalendarEvent {
        summary: Some("Moved".to_string()),
        ..CalendarEvent::default()
    };
    let options = UpdateOptions {
        patch_only: true,
        fields: None,
    };

    let updated = adapter.update_remote_event("ev1", &patch, &options).await.unwrap();

    assert_eq!(updated.summary.as_deref(), Some("Moved"));
    assert!(adapter.events().is_empty());
}
