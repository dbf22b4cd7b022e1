//! DTOs for health check endpoint.

use serde::Serialize;

/// Health check response with integration status.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub integrations: Integrations,
}

/// Whether each vendor has credentials configured.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Integrations {
    pub bitly: IntegrationStatus,
    pub mailchimp: IntegrationStatus,
    pub ticket_tailor: IntegrationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Configured,
    NotConfigured,
}

impl IntegrationStatus {
    pub fn of<T>(service: Option<&T>) -> Self {
        if service.is_some() {
            Self::Configured
        } else {
            Self::NotConfigured
        }
    }
}
