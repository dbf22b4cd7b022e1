//! Inbound action request shared by every integration.

use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::error::AppError;

/// JSON body accepted by every integration endpoint.
///
/// Numeric fields accept either JSON numbers or numeric strings, since the
/// dashboard sends both. Unknown fields are ignored.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default)]
    pub action: Option<String>,

    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub days: Option<u32>,

    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub weeks: Option<u32>,

    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(default)]
    pub end_date: Option<String>,

    /// Ticket Tailor ids are strings, but any JSON scalar is accepted.
    #[serde(default, deserialize_with = "scalar_string")]
    pub event_id: Option<String>,
}

impl ActionRequest {
    /// Parses a raw request body; an empty body is treated as `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the body is not valid JSON or a
    /// field has the wrong type.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            AppError::bad_request(
                format!("Invalid request body: {e}"),
                serde_json::json!({}),
            )
        })
    }

    pub fn action_name(&self) -> Option<&str> {
        self.action.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    /// Reporting window in days (default 30, range 1-365).
    pub fn days_or_default(&self) -> Result<u32, AppError> {
        bounded("days", self.days, 30, 1..=365)
    }

    /// Number of weekly buckets (default 12, range 1-52).
    pub fn weeks_or_default(&self) -> Result<u32, AppError> {
        bounded("weeks", self.weeks, 12, 1..=52)
    }

    /// Non-blank event id, if any.
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

fn bounded(
    name: &str,
    value: Option<u32>,
    default: u32,
    range: std::ops::RangeInclusive<u32>,
) -> Result<u32, AppError> {
    let value = value.unwrap_or(default);
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(AppError::bad_request(
            format!(
                "{name} must be between {} and {}",
                range.start(),
                range.end()
            ),
            serde_json::json!({ name: value }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_default() {
        let request = ActionRequest::from_body(b"").unwrap();
        assert!(request.action_name().is_none());
        let request = ActionRequest::from_body(b"  \n").unwrap();
        assert!(request.action.is_none());
    }

    #[test]
    fn test_numbers_accept_strings() {
        let request =
            ActionRequest::from_body(br#"{"action":"getLinkTrends","days":"7","weeks":4}"#)
                .unwrap();
        assert_eq!(request.action_name(), Some("getLinkTrends"));
        assert_eq!(request.days, Some(7));
        assert_eq!(request.weeks, Some(4));
    }

    #[test]
    fn test_camel_case_fields() {
        let request = ActionRequest::from_body(
            br#"{"action":"getEvents","startDate":"2025-01-01","eventId":"ev_1","extra":true}"#,
        )
        .unwrap();
        assert_eq!(request.start_date.as_deref(), Some("2025-01-01"));
        assert_eq!(request.event_id(), Some("ev_1"));
    }

    #[test]
    fn test_numeric_event_id() {
        let request = ActionRequest::from_body(br#"{"eventId":12345}"#).unwrap();
        assert_eq!(request.event_id(), Some("12345"));
        let request = ActionRequest::from_body(br#"{"eventId":null}"#).unwrap();
        assert!(request.event_id().is_none());
        assert!(ActionRequest::from_body(br#"{"eventId":["ev_1"]}"#).is_err());
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let error = ActionRequest::from_body(b"{not json").unwrap_err();
        assert_eq!(error.status().as_u16(), 400);
        let error = ActionRequest::from_body(br#"{"days":"soon"}"#).unwrap_err();
        assert_eq!(error.status().as_u16(), 400);
    }

    #[test]
    fn test_defaults_and_bounds() {
        let request = ActionRequest::default();
        assert_eq!(request.days_or_default().unwrap(), 30);
        assert_eq!(request.weeks_or_default().unwrap(), 12);

        let request = ActionRequest {
            days: Some(0),
            weeks: Some(53),
            ..Default::default()
        };
        assert!(request.days_or_default().is_err());
        assert!(request.weeks_or_default().is_err());
    }

    #[test]
    fn test_blank_event_id_is_none() {
        let request = ActionRequest {
            event_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(request.event_id().is_none());
    }
}
