//! Per-vendor pipelines.
//!
//! Each service owns one upstream client and turns an [`ActionRequest`]
//! into a JSON payload via `dispatch`. The HTTP handlers and the `dashctl`
//! binary both go through `dispatch`, so they share one code path.
//!
//! [`ActionRequest`]: crate::application::action::ActionRequest

pub mod bitly_service;
pub mod mailchimp_service;
pub mod ticket_tailor_service;

pub use bitly_service::BitlyService;
pub use mailchimp_service::MailchimpService;
pub use ticket_tailor_service::TicketTailorService;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::domain::deadline::Deadline;
use crate::domain::shape;
use crate::domain::upstream::{FetchError, UpstreamResponse};
use crate::error::AppError;

/// Limits shared by every pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub deadline: Duration,
    /// Page ceiling for primary listings.
    pub max_pages: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            deadline: config.pipeline_deadline(),
            max_pages: config.max_listing_pages,
        }
    }

    pub fn start_deadline(&self) -> Deadline {
        Deadline::after(self.deadline)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(20),
            max_pages: 20,
        }
    }
}

/// Converts a non-200 essential response into an error carrying its status.
pub(crate) fn upstream_error(response: &UpstreamResponse, fallback: &str) -> AppError {
    let message = shape::error_message(&response.body).unwrap_or_else(|| fallback.to_string());
    AppError::upstream(
        response.status,
        message,
        json!({ "details": response.body }),
    )
}

/// Awaits an essential upstream call, giving up at the pipeline deadline.
///
/// # Errors
///
/// Returns a 504 [`AppError::Upstream`] when the deadline fires first and an
/// internal error on transport failure.
pub(crate) async fn essential_call<F>(deadline: Deadline, call: F) -> Result<UpstreamResponse, AppError>
where
    F: Future<Output = Result<UpstreamResponse, FetchError>>,
{
    match deadline.run(call).await {
        Some(response) => Ok(response?),
        None => {
            tracing::warn!("Essential upstream call abandoned at deadline");
            Err(AppError::upstream(
                504,
                "Upstream deadline exceeded",
                json!({}),
            ))
        }
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-03-01T12:00:00.000Z`.
pub(crate) fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn to_json<T: Serialize>(report: &T) -> Result<Value, AppError> {
    serde_json::to_value(report).map_err(|e| {
        AppError::internal(
            "Failed to serialize response",
            json!({ "details": e.to_string() }),
        )
    })
}
