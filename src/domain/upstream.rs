//! Upstream fetch contract shared by every vendor integration.
//!
//! An [`UpstreamClient`] is bound to a single vendor host and credential.
//! Callers pass only a path and query parameters, and get back a status-tagged
//! [`UpstreamResponse`] instead of an error for non-200 responses.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Opaque API token or key for one vendor.
///
/// Never printed in full: `Debug` and `Display` show only a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw secret. Returns `None` for empty or whitespace-only input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Raw secret, for building the auth header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form safe for logs.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}***")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Ordered query parameters for one upstream call.
///
/// Values are stringified on insertion; encoding happens in the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a parameter, replacing an existing value for the same key.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Result of one upstream GET.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// True only for HTTP 200; other 2xx codes are not treated as success.
    pub ok: bool,
    pub status: u16,
    /// Parsed JSON body (`Null` for an empty body).
    pub body: Value,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            ok: status == 200,
            status,
            body,
        }
    }
}

/// Failures that prevent a status-tagged response from being produced.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Failed to parse upstream response: {0}")]
    Parse(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}

/// Authenticated GET access to one vendor API.
///
/// # Implementations
///
/// - [`crate::infrastructure::http::HttpUpstream`] - reqwest-backed client
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issues a GET for `path` (no scheme or host) with `params`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] on network failure and
    /// [`FetchError::Parse`] when the body is not JSON. Non-200 statuses are
    /// reported through [`UpstreamResponse::ok`], not as errors.
    async fn get(&self, path: &str, params: &QueryParams) -> Result<UpstreamResponse, FetchError>;
}
