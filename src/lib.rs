//! # Dashboard Proxy
//!
//! Aggregating HTTP proxy in front of Bitly, Mailchimp and Ticket Tailor for
//! a marketing dashboard, built with Axum.
//!
//! ## Architecture
//!
//! The crate keeps the usual layer separation:
//!
//! - **Domain Layer** ([`domain`]) - Upstream client trait, pagination,
//!   enrichment, response-shape probing and aggregation
//! - **Application Layer** ([`application`]) - Action parsing and the
//!   per-vendor pipelines
//! - **Infrastructure Layer** ([`infrastructure`]) - The `reqwest`-backed
//!   upstream client
//! - **API Layer** ([`api`]) - Handlers, DTOs and middleware
//!
//! ## Pipelines
//!
//! Every request follows the same shape: fetch a primary listing page by
//! page, enrich each item with concurrent secondary calls, then fold the
//! results into totals and rankings. Secondary failures degrade single
//! items instead of failing the request, and the whole run is bounded by a
//! deadline; responses say so with `partial` and `truncated` flags.
//!
//! ## Quick Start
//!
//! ```bash
//! export BITLY_ACCESS_TOKEN="..."
//! export TICKET_TAILOR_API_KEY="sk_..."
//!
//! cargo run
//!
//! curl -X POST localhost:3000/api/bitly -d '{"action":"getRecruitmentLinks"}'
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for the CLI
/// and integration tests.
pub mod prelude {
    pub use crate::application::action::ActionRequest;
    pub use crate::application::services::{
        BitlyService, MailchimpService, PipelineSettings, TicketTailorService,
    };
    pub use crate::domain::upstream::{FetchError, QueryParams, UpstreamClient, UpstreamResponse};
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
