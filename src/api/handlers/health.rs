//! Handler for health check endpoint.

use axum::{Json, extract::State};

use crate::api::dto::health::{HealthResponse, IntegrationStatus, Integrations};
use crate::state::AppState;

/// Reports which integrations have credentials configured.
///
/// # Endpoint
///
/// `GET /health`
///
/// Never calls an upstream API, so it stays cheap enough for liveness probes.
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "version": "0.1.0",
///   "integrations": {
///     "bitly": "configured",
///     "mailchimp": "not_configured",
///     "ticketTailor": "configured"
///   }
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        integrations: Integrations {
            bitly: IntegrationStatus::of(state.bitly.as_ref()),
            mailchimp: IntegrationStatus::of(state.mailchimp.as_ref()),
            ticket_tailor: IntegrationStatus::of(state.ticket_tailor.as_ref()),
        },
    })
}
