//! Per-item secondary fetches with typed degradation.
//!
//! Enrichment calls for a batch are issued concurrently and reassembled in
//! input order. A failed call never fails the batch: it becomes
//! [`Enrichment::Degraded`] and the caller substitutes a zero value.

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

use crate::domain::deadline::Deadline;
use crate::domain::shape::{self, Probe};
use crate::domain::upstream::{QueryParams, UpstreamClient};

/// Why an enrichment fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    /// Upstream answered with a non-200 status.
    Status(u16),
    /// Transport or parse failure.
    Fetch(String),
    /// The pipeline deadline fired before the call finished.
    Deadline,
}

/// Outcome of one secondary fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment<T> {
    Fetched(T),
    Degraded(DegradeReason),
}

impl<T> Enrichment<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Enrichment::Degraded(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Enrichment<U> {
        match self {
            Enrichment::Fetched(value) => Enrichment::Fetched(f(value)),
            Enrichment::Degraded(reason) => Enrichment::Degraded(reason),
        }
    }
}

impl<T: Default> Enrichment<T> {
    /// The fetched value, or the zero/empty substitute.
    pub fn value_or_default(self) -> T {
        match self {
            Enrichment::Fetched(value) => value,
            Enrichment::Degraded(_) => T::default(),
        }
    }
}

/// Enrichment results for a batch, index-aligned with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<T> {
    pub values: Vec<Enrichment<T>>,
    /// At least one call was abandoned at the deadline.
    pub partial: bool,
}

impl<T> Enriched<T> {
    pub fn degraded_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_degraded()).count()
    }
}

/// Runs `fetch` for every item concurrently.
///
/// Output order always matches `items`, regardless of completion order.
pub async fn enrich_all<I, T, F, Fut>(items: &[I], deadline: Option<Deadline>, fetch: F) -> Enriched<T>
where
    F: Fn(&I) -> Fut,
    Fut: Future<Output = Enrichment<T>>,
{
    let calls = items.iter().map(|item| {
        let call = fetch(item);
        async move {
            match deadline {
                Some(deadline) => deadline
                    .run(call)
                    .await
                    .unwrap_or(Enrichment::Degraded(DegradeReason::Deadline)),
                None => call.await,
            }
        }
    });

    let values = join_all(calls).await;
    let partial = values
        .iter()
        .any(|v| matches!(v, Enrichment::Degraded(DegradeReason::Deadline)));

    Enriched { values, partial }
}

/// One secondary GET, with the body reshaped by `extract`.
pub async fn fetch_secondary<T>(
    client: &dyn UpstreamClient,
    path: &str,
    params: &QueryParams,
    extract: impl FnOnce(&Value) -> T,
) -> Enrichment<T> {
    match client.get(path, params).await {
        Ok(response) if response.ok => Enrichment::Fetched(extract(&response.body)),
        Ok(response) => {
            tracing::warn!(path, status = response.status, "Secondary fetch failed");
            Enrichment::Degraded(DegradeReason::Status(response.status))
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "Secondary fetch failed");
            Enrichment::Degraded(DegradeReason::Fetch(e.to_string()))
        }
    }
}

/// Canonical breakdown entry (referrer, country, ...) with its click count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCount {
    /// Dimension value; `None` when upstream sent none.
    pub value: Option<String>,
    pub clicks: u64,
}

/// Normalizes a metrics breakdown body into [`MetricCount`] entries.
pub fn metric_counts(body: &Value, list: &[Probe], key: &[&str]) -> Vec<MetricCount> {
    shape::probe_array(body, list)
        .iter()
        .map(|entry| MetricCount {
            value: shape::probe_str(entry, key).map(str::to_string),
            clicks: shape::count_field(entry, "clicks"),
        })
        .collect()
}
