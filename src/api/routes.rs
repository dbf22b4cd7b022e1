//! API route configuration.
//!
//! Every integration endpoint accepts any method: the dashboard posts JSON
//! bodies, and preflight `OPTIONS` requests are answered by
//! [`crate::api::middleware::cors`] before reaching a handler.

use crate::api::handlers::{bitly_handler, mailchimp_handler, ticket_tailor_handler};
use crate::api::middleware::cors;
use crate::state::AppState;
use axum::{Router, middleware, routing::any};

/// Integration routes, wrapped in the CORS middleware.
///
/// # Endpoints
///
/// - `/bitly`         - Bitly recruitment link analytics
/// - `/mailchimp`     - Mailchimp audience growth and campaigns
/// - `/ticket-tailor` - Ticket Tailor events and ticket sales
pub fn integration_routes() -> Router<AppState> {
    Router::new()
        .route("/bitly", any(bitly_handler))
        .route("/mailchimp", any(mailchimp_handler))
        .route("/ticket-tailor", any(ticket_tailor_handler))
        .layer(middleware::from_fn(cors::layer))
}
