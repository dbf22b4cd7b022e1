//! HTTP-facing error type.
//!
//! Every error response has a flat JSON body with a human-readable `error`
//! string. Object-valued `details` are merged into the body next to it.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::domain::upstream::FetchError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug)]
pub enum AppError {
    /// A vendor credential is missing from the environment.
    NotConfigured { service: &'static str },
    /// The request named an action the integration does not provide.
    InvalidAction { valid_actions: &'static [&'static str] },
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    /// An essential upstream call returned a non-200 status.
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn not_configured(service: &'static str) -> Self {
        Self::NotConfigured { service }
    }
    pub fn invalid_action(valid_actions: &'static [&'static str]) -> Self {
        Self::InvalidAction { valid_actions }
    }
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn upstream(status: u16, message: impl Into<String>, details: Value) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Status code this error is reported with.
    ///
    /// Upstream statuses below 400 (e.g. a 204 where 200 was required) are
    /// reported as 502 so the response is never mistaken for success.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotConfigured { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvalidAction { .. } | AppError::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::NotConfigured { service } => format!("{service} not configured"),
            AppError::InvalidAction { .. } => "Invalid action".to_string(),
            AppError::Validation { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Upstream { message, .. }
            | AppError::Internal { message, .. } => message.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.status().as_u16())
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.message();

        let details = match self {
            AppError::InvalidAction { valid_actions } => json!({ "validActions": valid_actions }),
            AppError::Validation { details, .. }
            | AppError::NotFound { details, .. }
            | AppError::Upstream { details, .. }
            | AppError::Internal { details, .. } => details,
            AppError::NotConfigured { .. } => Value::Null,
        };

        let extra = match details {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{error}");
        } else {
            tracing::warn!(status = status.as_u16(), "{error}");
        }

        (status, Json(ErrorBody { error, extra })).into_response()
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::internal(e.to_string(), json!({}))
    }
}
