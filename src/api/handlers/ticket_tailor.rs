//! Handler for the Ticket Tailor integration.

use axum::{Json, body::Bytes, extract::State};
use serde_json::Value;

use crate::api::dto::ActionRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Runs a Ticket Tailor action.
///
/// # Endpoint
///
/// `POST /api/ticket-tailor`
///
/// # Actions
///
/// - `getEvents` - published events with ticket counts; `startDate` and
///   `endDate` narrow the window (default: from today)
/// - `getEventDetails` - one event with its issued tickets; requires `eventId`
/// - `getSalesVelocity` - tickets issued per day for every published event
pub async fn ticket_tailor_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let service = state
        .ticket_tailor
        .as_ref()
        .ok_or_else(|| AppError::not_configured("Ticket Tailor API key"))?;

    let request = ActionRequest::from_body(&body)?;
    tracing::info!(action = request.action_name(), "Ticket Tailor request");

    Ok(Json(service.dispatch(&request).await?))
}
