//! Handler for the Mailchimp integration.

use axum::{Json, body::Bytes, extract::State};
use serde_json::Value;

use crate::api::dto::ActionRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Runs a Mailchimp action (`getLeadStats` with optional `weeks`, or
/// `getCampaigns`) against the configured audience.
///
/// # Endpoint
///
/// `POST /api/mailchimp`
pub async fn mailchimp_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let service = state
        .mailchimp
        .as_ref()
        .ok_or_else(|| AppError::not_configured("Mailchimp"))?;

    let request = ActionRequest::from_body(&body)?;
    tracing::info!(action = request.action_name(), "Mailchimp request");

    Ok(Json(service.dispatch(&request).await?))
}
