//! Domain layer: the vendor-independent fetch, paginate, enrich and aggregate core.
//!
//! # Architecture
//!
//! - [`upstream`] - Authenticated fetch contract ([`upstream::UpstreamClient`])
//! - [`pagination`] - Sequential, deduplicating collection of listing endpoints
//! - [`enrichment`] - Concurrent per-item secondary fetches with typed degradation
//! - [`shape`] - Ordered probes for fields that moved between API versions
//! - [`aggregate`] - Grouped sums, rankings, percentages and tag matching
//! - [`deadline`] - Per-invocation time budget
//!
//! # Pipeline
//!
//! 1. An essential call or [`pagination::Paginator`] produces the primary items
//! 2. [`enrichment::enrich_all`] fans out secondary fetches per item
//! 3. [`aggregate::GroupedCounts`] folds enriched items into summaries
//!
//! Vendor specifics live in [`crate::application::services`].

pub mod aggregate;
pub mod deadline;
pub mod enrichment;
pub mod pagination;
pub mod shape;
pub mod upstream;
