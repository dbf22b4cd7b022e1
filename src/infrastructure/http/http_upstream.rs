//! reqwest-backed upstream client.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::domain::upstream::{
    Credential, FetchError, QueryParams, UpstreamClient, UpstreamResponse,
};

/// How the credential is presented to the vendor.
///
/// The scheme is fixed per vendor; a mismatch is rejected upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <credential>`
    Bearer,
    /// `Authorization: Basic base64("<credential>:")`, i.e. basic auth with the
    /// key as username and an empty password.
    BasicKey,
}

/// Client bound to one vendor base URL and credential.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    vendor: &'static str,
    base_url: String,
    credential: Credential,
    auth: AuthScheme,
}

impl HttpUpstream {
    /// Creates a client for `base_url` (scheme, host and API version prefix).
    pub fn new(
        vendor: &'static str,
        base_url: impl Into<String>,
        credential: Credential,
        auth: AuthScheme,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(vendor, %base_url, credential = %credential, "Upstream client configured");

        Self {
            client: reqwest::Client::new(),
            vendor,
            base_url,
            credential,
            auth,
        }
    }

    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        match self.auth {
            AuthScheme::Bearer => format!("Bearer {}", self.credential.expose()),
            AuthScheme::BasicKey => {
                let token = STANDARD.encode(format!("{}:", self.credential.expose()));
                format!("Basic {token}")
            }
        }
    }

    /// Joins `path` onto the base URL and appends encoded query parameters.
    ///
    /// No `?` is added when `params` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the result does not parse.
    pub fn build_url(&self, path: &str, params: &QueryParams) -> Result<Url, FetchError> {
        let separator = if path.starts_with('/') { "" } else { "/" };
        let mut url = Url::parse(&format!("{}{}{}", self.base_url, separator, path))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        Ok(url)
    }
}

/// Parses a response body; an empty body becomes `Null`.
fn parse_body(text: &str) -> Result<Value, FetchError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Bytes left as-is in a path segment; everything else is percent-encoded.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encodes one value for use as a single path segment (`bit.ly/x` → `bit.ly%2Fx`).
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<UpstreamResponse, FetchError> {
        let url = self.build_url(path, params)?;

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.authorization())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        debug!(vendor = self.vendor, path, status, "Upstream response");

        let body = parse_body(&text)?;
        Ok(UpstreamResponse::new(status, body))
    }
}
