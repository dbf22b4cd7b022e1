//! Handler for the Bitly integration.

use axum::{Json, body::Bytes, extract::State};
use serde_json::Value;

use crate::api::dto::ActionRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Runs a Bitly action.
///
/// # Endpoint
///
/// `POST /api/bitly` (any method is accepted; `OPTIONS` is answered by the
/// CORS middleware)
///
/// # Request Body
///
/// ```json
/// { "action": "getRecruitmentLinks", "days": 30 }
/// ```
///
/// - `action`: `getRecruitmentLinks` or `getLinkTrends`
/// - `days` (optional): reporting window, 1-365 (default: 30)
///
/// # Errors
///
/// - **500**: `BITLY_ACCESS_TOKEN` is not set
/// - **400**: malformed body, unknown action (with `validActions`) or bad `days`
/// - **404**: the account has no groups
/// - upstream status when an essential Bitly call fails
pub async fn bitly_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let service = state
        .bitly
        .as_ref()
        .ok_or_else(|| AppError::not_configured("Bitly"))?;

    let request = ActionRequest::from_body(&body)?;
    tracing::info!(action = request.action_name(), "Bitly request");

    Ok(Json(service.dispatch(&request).await?))
}
