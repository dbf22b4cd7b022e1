//! Ticket Tailor events, ticket sales and sales velocity.

use chrono::{DateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use super::{PipelineSettings, essential_call, timestamp, to_json};
use crate::application::action::ActionRequest;
use crate::domain::aggregate::GroupedCounts;
use crate::domain::deadline::Deadline;
use crate::domain::enrichment::{DegradeReason, Enriched, Enrichment, enrich_all};
use crate::domain::pagination::{CursorStyle, FailurePolicy, ListingRequest, Paginated, Paginator};
use crate::domain::shape;
use crate::domain::upstream::{Credential, QueryParams, UpstreamClient};
use crate::error::AppError;
use crate::infrastructure::http::{AuthScheme, HttpUpstream, encode_segment};

pub const TICKET_TAILOR_BASE_URL: &str = "https://api.tickettailor.com/v1";
pub const TICKET_TAILOR_ACTIONS: &[&str] = &["getEvents", "getEventDetails", "getSalesVelocity"];

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 10;
const TICKET_ERROR: &str = "Could not fetch ticket details";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketTailorAction {
    Events,
    EventDetails,
    SalesVelocity,
}

impl FromStr for TicketTailorAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getEvents" => Ok(Self::Events),
            "getEventDetails" => Ok(Self::EventDetails),
            "getSalesVelocity" => Ok(Self::SalesVelocity),
            _ => Err(AppError::invalid_action(TICKET_TAILOR_ACTIONS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub event_date: Option<String>,
    pub event_url: Option<String>,
    pub total_tickets_released: u64,
    pub total_tickets_issued: u64,
    pub tickets_available: u64,
    pub tickets_by_type: IndexMap<String, u64>,
    pub status: Option<String>,
    pub venue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsSummary {
    pub total_sold: u64,
    pub total_released: u64,
    pub total_events: usize,
    pub tickets_by_type: IndexMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsReport {
    pub events: Vec<EventSummary>,
    pub total_events: usize,
    pub summary: EventsSummary,
    pub truncated: bool,
    pub partial: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetailsReport {
    pub event: Value,
    pub truncated: bool,
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventVelocity {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub daily_sales: Vec<DailySales>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesVelocityReport {
    pub sales_velocity: Vec<EventVelocity>,
    pub truncated: bool,
    pub partial: bool,
    pub timestamp: String,
}

/// Pipelines over the Ticket Tailor v1 API.
pub struct TicketTailorService {
    client: Arc<dyn UpstreamClient>,
    settings: PipelineSettings,
}

impl TicketTailorService {
    pub fn new(client: Arc<dyn UpstreamClient>, settings: PipelineSettings) -> Self {
        Self { client, settings }
    }

    /// Service backed by the real API; the key is sent as a basic-auth username.
    pub fn from_key(key: Credential, settings: PipelineSettings) -> Self {
        let client = HttpUpstream::new(
            "ticket-tailor",
            TICKET_TAILOR_BASE_URL,
            key,
            AuthScheme::BasicKey,
        );
        Self::new(Arc::new(client), settings)
    }

    /// Runs the action named in `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidAction`] for an unknown action,
    /// [`AppError::Validation`] when `getEventDetails` has no event id, and
    /// upstream errors from essential calls.
    pub async fn dispatch(&self, request: &ActionRequest) -> Result<Value, AppError> {
        let action: TicketTailorAction = request.action_name().unwrap_or_default().parse()?;
        let now = Utc::now();

        match action {
            TicketTailorAction::Events => {
                let report = self
                    .events(
                        request.start_date.as_deref(),
                        request.end_date.as_deref(),
                        now,
                    )
                    .await?;
                to_json(&report)
            }
            TicketTailorAction::EventDetails => to_json(&self.event_details(request.event_id()).await?),
            TicketTailorAction::SalesVelocity => to_json(&self.sales_velocity(now).await?),
        }
    }

    /// Published events from `start_date` (default: today) with ticket counts.
    pub async fn events(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<EventsReport, AppError> {
        let deadline = self.settings.start_deadline();

        let start = match start_date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(start) => start.to_string(),
            None => timestamp(now.date_naive().and_time(NaiveTime::MIN).and_utc()),
        };
        let mut params = QueryParams::new()
            .with("status", "published")
            .with("start", start);
        if let Some(end) = end_date.map(str::trim).filter(|s| !s.is_empty()) {
            params.set("end", end);
        }

        let listing = self.list_events(params, deadline).await?;
        let tickets = self.tickets_per_event(&listing.items, deadline).await;
        let mut partial = listing.partial || tickets.partial;
        let mut truncated = listing.truncated;

        let mut by_type = GroupedCounts::new("Unknown");
        let mut events = Vec::with_capacity(listing.items.len());
        for (event, tickets) in listing.items.iter().zip(tickets.values) {
            let summary = match tickets {
                Enrichment::Fetched(tickets) => {
                    partial |= tickets.partial;
                    truncated |= tickets.truncated;
                    event_summary(event, Some(tickets.items.as_slice()))
                }
                Enrichment::Degraded(reason) => {
                    tracing::warn!(event = ?shape::id_of(event, "id"), ?reason, "Ticket details unavailable");
                    event_summary(event, None)
                }
            };
            for (name, count) in &summary.tickets_by_type {
                by_type.add(Some(name.as_str()), *count);
            }
            events.push(summary);
        }

        let summary = EventsSummary {
            total_sold: events.iter().map(|e| e.total_tickets_issued).sum(),
            total_released: events.iter().map(|e| e.total_tickets_released).sum(),
            total_events: events.len(),
            tickets_by_type: by_type.as_map().clone(),
        };
        tracing::info!(events = events.len(), sold = summary.total_sold, truncated, partial, "Events aggregated");

        Ok(EventsReport {
            total_events: events.len(),
            events,
            summary,
            truncated,
            partial,
            timestamp: timestamp(now),
        })
    }

    /// One event with every issued ticket attached.
    pub async fn event_details(&self, event_id: Option<&str>) -> Result<EventDetailsReport, AppError> {
        let Some(event_id) = event_id else {
            return Err(AppError::bad_request("Event ID is required", json!({})));
        };
        let deadline = self.settings.start_deadline();

        let path = format!("/events/{}", encode_segment(event_id));
        let params = QueryParams::new();
        let response = essential_call(deadline, self.client.get(&path, &params)).await?;
        if !response.ok {
            return Err(AppError::upstream(
                response.status,
                "Event not found",
                json!({
                    "message": format!("Event {event_id} may have been deleted or is no longer accessible")
                }),
            ));
        }

        let (tickets, truncated, partial) = match self.issued_tickets(event_id, deadline).await {
            Enrichment::Fetched(paginated) => (paginated.items, paginated.truncated, paginated.partial),
            Enrichment::Degraded(_) => (Vec::new(), false, true),
        };

        let mut event = match response.body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        event.insert("ticketsIssued".to_string(), json!(tickets.len()));
        event.insert("tickets".to_string(), Value::Array(tickets));

        Ok(EventDetailsReport {
            event: Value::Object(event),
            truncated,
            partial,
        })
    }

    /// Tickets issued per day for every published event.
    pub async fn sales_velocity(&self, now: DateTime<Utc>) -> Result<SalesVelocityReport, AppError> {
        let deadline = self.settings.start_deadline();
        let params = QueryParams::new().with("status", "published");
        let listing = self.list_events(params, deadline).await?;

        let tickets = self.tickets_per_event(&listing.items, deadline).await;
        let mut partial = listing.partial || tickets.partial;
        let mut truncated = listing.truncated;

        let sales_velocity = listing
            .items
            .iter()
            .zip(tickets.values)
            .map(|(event, tickets)| {
                let tickets = match tickets {
                    Enrichment::Fetched(paginated) => {
                        partial |= paginated.partial;
                        truncated |= paginated.truncated;
                        paginated.items
                    }
                    Enrichment::Degraded(_) => Vec::new(),
                };
                EventVelocity {
                    event_id: shape::id_of(event, "id"),
                    event_name: shape::probe_str(event, &["name"]).map(str::to_string),
                    daily_sales: daily_sales(&tickets),
                }
            })
            .collect();

        Ok(SalesVelocityReport {
            sales_velocity,
            truncated,
            partial,
            timestamp: timestamp(now),
        })
    }

    async fn list_events(&self, params: QueryParams, deadline: Deadline) -> Result<Paginated, AppError> {
        let request = ListingRequest {
            label: "events",
            path: "/events".to_string(),
            params,
            page_size_param: "limit",
            items: shape::TICKET_TAILOR_DATA,
            cursor: CursorStyle::StartingAfter,
            id_field: "id",
        };

        Paginator::new(PAGE_SIZE, self.settings.max_pages.min(MAX_PAGES))
            .with_deadline(deadline)
            .collect(self.client.as_ref(), &request)
            .await
    }

    async fn tickets_per_event(&self, events: &[Value], deadline: Deadline) -> Enriched<Paginated> {
        enrich_all(events, Some(deadline), |event| {
            let id = shape::id_of(event, "id");
            async move {
                match id {
                    Some(id) => self.issued_tickets(&id, deadline).await,
                    None => Enrichment::Degraded(DegradeReason::Fetch("event has no id".to_string())),
                }
            }
        })
        .await
    }

    /// Every issued ticket of one event, best effort.
    ///
    /// Degraded only when not a single page could be fetched; a failure on a
    /// later page keeps the earlier pages and marks the result partial.
    async fn issued_tickets(&self, event_id: &str, deadline: Deadline) -> Enrichment<Paginated> {
        let request = ListingRequest {
            label: "issued tickets",
            path: "/issued_tickets".to_string(),
            params: QueryParams::new().with("event_id", event_id),
            page_size_param: "limit",
            items: shape::TICKET_TAILOR_DATA,
            cursor: CursorStyle::StartingAfter,
            id_field: "id",
        };

        let collected = Paginator::new(PAGE_SIZE, MAX_PAGES)
            .with_policy(FailurePolicy::BestEffort)
            .with_deadline(deadline)
            .collect(self.client.as_ref(), &request)
            .await;

        match collected {
            Ok(paginated) if paginated.pages_fetched == 0 && paginated.partial => {
                if deadline.has_passed() {
                    Enrichment::Degraded(DegradeReason::Deadline)
                } else {
                    Enrichment::Degraded(DegradeReason::Fetch(format!(
                        "issued tickets for {event_id} unavailable"
                    )))
                }
            }
            Ok(paginated) => Enrichment::Fetched(paginated),
            Err(e) => Enrichment::Degraded(DegradeReason::Fetch(e.to_string())),
        }
    }
}

/// Dashboard view of one event; `tickets` is `None` when they could not be fetched.
fn event_summary(event: &Value, tickets: Option<&[Value]>) -> EventSummary {
    let released = shape::count_field(event, "total_tickets");

    let mut by_type = GroupedCounts::new("Unknown");
    for ticket in tickets.unwrap_or_default() {
        by_type.add(shape::probe_path_str(ticket, shape::TICKET_TYPE_NAME), 1);
    }
    let issued = tickets.map_or(0, |t| t.len() as u64);

    EventSummary {
        event_id: shape::id_of(event, "id"),
        event_name: shape::probe_str(event, &["name"]).map(str::to_string),
        event_date: shape::probe_path_str(event, shape::EVENT_START).map(str::to_string),
        event_url: shape::probe_str(event, &["url"]).map(str::to_string),
        total_tickets_released: released,
        total_tickets_issued: issued,
        tickets_available: released.saturating_sub(issued),
        tickets_by_type: by_type.as_map().clone(),
        status: shape::probe_str(event, &["status"]).map(str::to_string),
        venue: shape::probe_path_str(event, shape::VENUE_NAME)
            .unwrap_or("TBA")
            .to_string(),
        error: tickets.is_none().then(|| TICKET_ERROR.to_string()),
    }
}

/// Day a ticket was issued: the date part of an ISO string, or a unix timestamp.
fn ticket_day(ticket: &Value) -> Option<String> {
    match ticket.get("created_at")? {
        Value::String(s) => s.split('T').next().filter(|d| !d.is_empty()).map(str::to_string),
        Value::Number(n) => {
            let secs = n.as_i64()?;
            DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive().to_string())
        }
        _ => None,
    }
}

/// Ticket counts per day, oldest first.
fn daily_sales(tickets: &[Value]) -> Vec<DailySales> {
    let mut by_day: BTreeMap<String, u64> = BTreeMap::new();
    for day in tickets.iter().filter_map(ticket_day) {
        *by_day.entry(day).or_default() += 1;
    }
    by_day
        .into_iter()
        .map(|(date, count)| DailySales { date, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::upstream::{FetchError, MockUpstreamClient, UpstreamResponse};
    use chrono::TimeZone;

    fn service(mock: MockUpstreamClient) -> TicketTailorService {
        TicketTailorService::new(Arc::new(mock), PipelineSettings::default())
    }

    fn ok(body: Value) -> Result<UpstreamResponse, FetchError> {
        Ok(UpstreamResponse::new(200, body))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 15, 0).unwrap()
    }

    fn event(id: &str, total: u64) -> Value {
        json!({
            "id": id,
            "name": format!("Open Day {id}"),
            "start": { "date": "2025-04-01", "iso": "2025-04-01T10:00:00+01:00" },
            "url": format!("https://tickets.example.com/{id}"),
            "total_tickets": total,
            "status": "published",
            "venue": { "name": "Main Hall" }
        })
    }

    fn ticket(id: &str, kind: Option<&str>, created_at: Value) -> Value {
        match kind {
            Some(name) => json!({ "id": id, "ticket_type": { "name": name }, "created_at": created_at }),
            None => json!({ "id": id, "created_at": created_at }),
        }
    }

    #[test]
    fn test_event_summary_without_tickets() {
        let summary = event_summary(&json!({ "id": "ev_1", "total_tickets": 50 }), None);
        assert_eq!(summary.total_tickets_issued, 0);
        assert_eq!(summary.tickets_available, 50);
        assert_eq!(summary.venue, "TBA");
        assert_eq!(summary.error.as_deref(), Some(TICKET_ERROR));
    }

    #[test]
    fn test_tickets_available_saturates() {
        let tickets: Vec<Value> = (0..3)
            .map(|i| ticket(&format!("t{i}"), Some("General"), json!(0)))
            .collect();
        let summary = event_summary(&event("ev_1", 2), Some(tickets.as_slice()));
        assert_eq!(summary.total_tickets_issued, 3);
        assert_eq!(summary.tickets_available, 0);
        assert!(summary.error.is_none());
    }

    #[test]
    fn test_daily_sales_sorted_and_mixed_formats() {
        let tickets = vec![
            ticket("t1", None, json!("2025-02-03T10:00:00+00:00")),
            ticket("t2", None, json!(1738368000)), // 2025-02-01
            ticket("t3", None, json!("2025-02-03T18:00:00+00:00")),
            ticket("t4", None, Value::Null),
        ];
        assert_eq!(
            daily_sales(&tickets),
            vec![
                DailySales { date: "2025-02-01".to_string(), count: 1 },
                DailySales { date: "2025-02-03".to_string(), count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_events_pipeline() {
        let mut mock = MockUpstreamClient::new();
        mock.expect_get()
            .withf(|path, params| {
                path == "/events"
                    && params.get("status") == Some("published")
                    && params.get("start") == Some("2025-03-01T00:00:00.000Z")
                    && params.get("limit") == Some("100")
            })
            .times(1)
            .returning(|_, _| ok(json!({ "data": [event("ev_1", 100), event("ev_2", 10)], "links": { "next": null } })));
        mock.expect_get()
            .withf(|path, params| path == "/issued_tickets" && params.get("event_id") == Some("ev_1"))
            .times(1)
            .returning(|_, _| {
                ok(json!({ "data": [
                    ticket("t1", Some("General"), json!(0)),
                    ticket("t2", Some("VIP"), json!(0)),
                    ticket("t3", None, json!(0))
                ], "links": { "next": null } }))
            });
        mock.expect_get()
            .withf(|path, params| path == "/issued_tickets" && params.get("event_id") == Some("ev_2"))
            .times(1)
            .returning(|_, _| Ok(UpstreamResponse::new(404, json!({ "message": "Not found" }))));

        let report = service(mock).events(None, None, now()).await.unwrap();

        assert_eq!(report.total_events, 2);
        let first = &report.events[0];
        assert_eq!(first.event_date.as_deref(), Some("2025-04-01"));
        assert_eq!(first.venue, "Main Hall");
        assert_eq!(first.total_tickets_issued, 3);
        assert_eq!(first.tickets_available, 97);
        assert_eq!(first.tickets_by_type.get("Unknown"), Some(&1));

        let second = &report.events[1];
        assert_eq!(second.error.as_deref(), Some(TICKET_ERROR));
        assert_eq!(second.tickets_available, 10);

        assert_eq!(report.summary.total_sold, 3);
        assert_eq!(report.summary.total_released, 110);
        assert_eq!(report.summary.tickets_by_type.len(), 3);
        assert_eq!(report.timestamp, "2025-03-01T09:15:00.000Z");
    }

    /// Every page is full and advertises a next page.
    fn endless_tickets(params: &QueryParams) -> Result<UpstreamResponse, FetchError> {
        let start = params
            .get("starting_after")
            .and_then(|id| id.strip_prefix('t'))
            .and_then(|n| n.parse::<usize>().ok())
            .map_or(0, |n| n + 1);
        let data: Vec<Value> = (start..start + PAGE_SIZE)
            .map(|i| ticket(&format!("t{i}"), Some("General"), json!(0)))
            .collect();
        ok(json!({ "data": data, "links": { "next": "more" } }))
    }

    #[tokio::test]
    async fn test_ticket_ceiling_marks_events_truncated() {
        let mut mock = MockUpstreamClient::new();
        mock.expect_get()
            .withf(|path, _| path == "/events")
            .times(1)
            .returning(|_, _| ok(json!({ "data": [event("ev_1", 5000)], "links": { "next": null } })));
        mock.expect_get()
            .withf(|path, _| path == "/issued_tickets")
            .times(MAX_PAGES)
            .returning(|_, params| endless_tickets(params));

        let report = service(mock).events(None, None, now()).await.unwrap();

        assert_eq!(report.events[0].total_tickets_issued, (PAGE_SIZE * MAX_PAGES) as u64);
        assert!(report.truncated);
        assert!(!report.partial);
    }

    #[tokio::test]
    async fn test_ticket_ceiling_marks_details_and_velocity_truncated() {
        let mut mock = MockUpstreamClient::new();
        mock.expect_get()
            .withf(|path, _| path == "/events/ev_1")
            .times(1)
            .returning(|_, _| ok(event("ev_1", 5000)));
        mock.expect_get()
            .withf(|path, _| path == "/events")
            .times(1)
            .returning(|_, _| ok(json!({ "data": [event("ev_1", 5000)] })));
        mock.expect_get()
            .withf(|path, _| path == "/issued_tickets")
            .times(MAX_PAGES * 2)
            .returning(|_, params| endless_tickets(params));

        let service = service(mock);
        let details = service.event_details(Some("ev_1")).await.unwrap();
        assert!(details.truncated);
        assert_eq!(details.event["ticketsIssued"], PAGE_SIZE * MAX_PAGES);

        let velocity = service.sales_velocity(now()).await.unwrap();
        assert!(velocity.truncated);
    }

    #[tokio::test]
    async fn test_events_listing_failure_aborts() {
        let mut mock = MockUpstreamClient::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(UpstreamResponse::new(401, json!({ "message": "Invalid API key" }))));

        let error = service(mock)
            .events(Some("2025-01-01"), Some("2025-12-31"), now())
            .await
            .unwrap_err();
        assert_eq!(error.status().as_u16(), 401);
        assert_eq!(error.message(), "Invalid API key");
    }

    #[tokio::test]
    async fn test_event_details_requires_id() {
        let error = service(MockUpstreamClient::new())
            .event_details(None)
            .await
            .unwrap_err();
        assert_eq!(error.status().as_u16(), 400);
        assert_eq!(error.message(), "Event ID is required");
    }

    #[tokio::test]
    async fn test_event_details_not_found() {
        let mut mock = MockUpstreamClient::new();
        mock.expect_get()
            .withf(|path, _| path == "/events/ev_9")
            .times(1)
            .returning(|_, _| Ok(UpstreamResponse::new(404, json!({}))));

        let error = service(mock).event_details(Some("ev_9")).await.unwrap_err();
        assert_eq!(error.status().as_u16(), 404);
        assert_eq!(error.message(), "Event not found");
    }

    #[tokio::test]
    async fn test_event_details_merges_tickets() {
        let mut mock = MockUpstreamClient::new();
        mock.expect_get()
            .withf(|path, _| path == "/events/ev_1")
            .times(1)
            .returning(|_, _| ok(event("ev_1", 20)));
        mock.expect_get()
            .withf(|path, _| path == "/issued_tickets")
            .times(1)
            .returning(|_, _| ok(json!({ "data": [ticket("t1", Some("General"), json!(0))] })));

        let report = service(mock).event_details(Some("ev_1")).await.unwrap();

        assert_eq!(report.event["name"], "Open Day ev_1");
        assert_eq!(report.event["ticketsIssued"], 1);
        assert_eq!(report.event["tickets"].as_array().map(Vec::len), Some(1));
        assert!(!report.partial);
        assert!(!report.truncated);
    }

    #[tokio::test]
    async fn test_sales_velocity_keeps_failed_events() {
        let mut mock = MockUpstreamClient::new();
        mock.expect_get()
            .withf(|path, params| path == "/events" && params.get("start").is_none())
            .times(1)
            .returning(|_, _| ok(json!({ "data": [event("ev_1", 5), event("ev_2", 5)] })));
        mock.expect_get()
            .withf(|path, _| path == "/issued_tickets")
            .times(2)
            .returning(|_, params| {
                if params.get("event_id") == Some("ev_1") {
                    ok(json!({ "data": [
                        ticket("t1", None, json!("2025-02-02T08:00:00Z")),
                        ticket("t2", None, json!("2025-02-01T08:00:00Z"))
                    ]}))
                } else {
                    Err(FetchError::Transport("timed out".to_string()))
                }
            });

        let report = service(mock).sales_velocity(now()).await.unwrap();

        assert_eq!(report.sales_velocity.len(), 2);
        assert_eq!(report.sales_velocity[0].daily_sales[0].date, "2025-02-01");
        assert!(report.sales_velocity[1].daily_sales.is_empty());
    }
}
