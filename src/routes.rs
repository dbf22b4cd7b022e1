//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /health`             - Which integrations are configured
//! - `/api/bitly`               - Bitly dispatcher
//! - `/api/mailchimp`           - Mailchimp dispatcher
//! - `/api/ticket-tailor`       - Ticket Tailor dispatcher
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **CORS** - Preflight handling and fixed headers on `/api/*`
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::routes::integration_routes())
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
