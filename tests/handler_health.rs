mod common;

use dashboard_proxy::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn test_health_reports_unconfigured_integrations() {
    let server = common::test_server(AppState::default());

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "ok");
    assert!(json.get("version").is_some());
    assert_eq!(json["integrations"]["bitly"], "not_configured");
    assert_eq!(json["integrations"]["mailchimp"], "not_configured");
    assert_eq!(json["integrations"]["ticketTailor"], "not_configured");
}

#[tokio::test]
async fn test_health_never_calls_upstream() {
    let stub = Arc::new(common::StubUpstream::new());
    let server = common::test_server(common::bitly_state(stub.clone()));

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["integrations"]["bitly"], "configured");
    assert!(stub.calls().is_empty());
}
