#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::routing::get;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dashboard_proxy::api::handlers::health_handler;
use dashboard_proxy::api::routes::integration_routes;
use dashboard_proxy::prelude::*;

/// Upstream double answering with canned JSON per path.
///
/// Unknown paths answer `404 {"message": "Not Found"}`. Every request is
/// recorded as `path?key=value&...` for later assertions.
#[derive(Default)]
pub struct StubUpstream {
    routes: HashMap<String, (u16, Value)>,
    calls: Mutex<Vec<String>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, status: u16, body: Value) -> Self {
        self.routes.insert(path.to_string(), (status, body));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for StubUpstream {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<UpstreamResponse, FetchError> {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("{path}?{}", query.join("&")));

        Ok(match self.routes.get(path) {
            Some((status, body)) => UpstreamResponse::new(*status, body.clone()),
            None => UpstreamResponse::new(404, json!({ "message": "Not Found" })),
        })
    }
}

pub fn bitly_state(stub: Arc<StubUpstream>) -> AppState {
    AppState {
        bitly: Some(Arc::new(BitlyService::new(stub, PipelineSettings::default()))),
        ..Default::default()
    }
}

pub fn mailchimp_state(stub: Arc<StubUpstream>) -> AppState {
    AppState {
        mailchimp: Some(Arc::new(MailchimpService::new(
            stub,
            "aud1",
            PipelineSettings::default(),
        ))),
        ..Default::default()
    }
}

pub fn ticket_tailor_state(stub: Arc<StubUpstream>) -> AppState {
    AppState {
        ticket_tailor: Some(Arc::new(TicketTailorService::new(
            stub,
            PipelineSettings::default(),
        ))),
        ..Default::default()
    }
}

/// Router without path normalization, which `TestServer` cannot wrap.
pub fn test_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", integration_routes())
        .with_state(state)
}

pub fn test_server(state: AppState) -> TestServer {
    TestServer::new(test_app(state)).unwrap()
}
