mod common;

use axum::http::{Method, StatusCode};
use common::StubUpstream;
use dashboard_proxy::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn events_stub() -> StubUpstream {
    StubUpstream::new()
        .with(
            "/events",
            200,
            json!({
                "data": [{
                    "id": "ev_1",
                    "name": "Spring Open Day",
                    "start": { "date": "2025-04-05" },
                    "url": "https://tickets.example.com/ev_1",
                    "total_tickets": 40,
                    "status": "published",
                    "venue": { "name": "Great Hall" }
                }],
                "links": { "next": null }
            }),
        )
        .with(
            "/issued_tickets",
            200,
            json!({
                "data": [
                    { "id": "it_1", "description": "General Admission", "created_at": 1738400000 },
                    { "id": "it_2", "description": "General Admission", "created_at": 1738500000 }
                ],
                "links": { "next": null }
            }),
        )
}

#[tokio::test]
async fn test_preflight() {
    let server = common::test_server(AppState::default());

    let response = server.method(Method::OPTIONS, "/api/ticket-tailor").await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/json");
}

#[tokio::test]
async fn test_not_configured() {
    let server = common::test_server(AppState::default());

    let response = server
        .post("/api/ticket-tailor")
        .json(&json!({ "action": "getEvents" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>()["error"],
        "Ticket Tailor API key not configured"
    );
}

#[tokio::test]
async fn test_invalid_action() {
    let server = common::test_server(common::ticket_tailor_state(Arc::new(StubUpstream::new())));

    let response = server.post("/api/ticket-tailor").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json = response.json::<Value>();
    assert_eq!(
        json["validActions"],
        json!(["getEvents", "getEventDetails", "getSalesVelocity"])
    );
}

#[tokio::test]
async fn test_events_pipeline() {
    let stub = Arc::new(events_stub());
    let server = common::test_server(common::ticket_tailor_state(stub.clone()));

    let response = server
        .post("/api/ticket-tailor")
        .json(&json!({ "action": "getEvents", "startDate": "2025-01-01" }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["totalEvents"], 1);

    let event = &json["events"][0];
    assert_eq!(event["eventName"], "Spring Open Day");
    assert_eq!(event["eventDate"], "2025-04-05");
    assert_eq!(event["venue"], "Great Hall");
    assert_eq!(event["totalTicketsIssued"], 2);
    assert_eq!(event["ticketsAvailable"], 38);
    assert_eq!(event["ticketsByType"]["General Admission"], 2);
    assert!(event.get("error").is_none());

    assert_eq!(json["summary"]["totalSold"], 2);
    assert_eq!(json["summary"]["totalReleased"], 40);
    assert_eq!(json["partial"], false);

    let calls = stub.calls();
    assert!(calls[0].starts_with("/events?status=published&start=2025-01-01"));
    assert!(calls.contains(&"/issued_tickets?event_id=ev_1&limit=100".to_string()));
}

#[tokio::test]
async fn test_event_details_requires_event_id() {
    let server = common::test_server(common::ticket_tailor_state(Arc::new(events_stub())));

    let response = server
        .post("/api/ticket-tailor")
        .json(&json!({ "action": "getEventDetails" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Event ID is required");
}

#[tokio::test]
async fn test_event_details_not_found() {
    let server = common::test_server(common::ticket_tailor_state(Arc::new(events_stub())));

    let response = server
        .post("/api/ticket-tailor")
        .json(&json!({ "action": "getEventDetails", "eventId": "ev_gone" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let json = response.json::<Value>();
    assert_eq!(json["error"], "Event not found");
    assert_eq!(
        json["message"],
        "Event ev_gone may have been deleted or is no longer accessible"
    );
}

#[tokio::test]
async fn test_event_details_accepts_numeric_id() {
    let stub = Arc::new(events_stub());
    let server = common::test_server(common::ticket_tailor_state(stub.clone()));

    let response = server
        .post("/api/ticket-tailor")
        .json(&json!({ "action": "getEventDetails", "eventId": 42 }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>()["message"],
        "Event 42 may have been deleted or is no longer accessible"
    );
    assert!(stub.calls()[0].starts_with("/events/42"));
}

#[tokio::test]
async fn test_sales_velocity() {
    let server = common::test_server(common::ticket_tailor_state(Arc::new(events_stub())));

    let response = server
        .post("/api/ticket-tailor")
        .json(&json!({ "action": "getSalesVelocity" }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    let daily = &json["salesVelocity"][0]["dailySales"];
    assert_eq!(
        *daily,
        json!([
            { "date": "2025-02-01", "count": 1 },
            { "date": "2025-02-02", "count": 1 }
        ])
    );
}
