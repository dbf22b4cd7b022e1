//! HTTP request handlers for API endpoints.
//!
//! One handler per integration; each checks its credentials, parses the
//! action body and hands off to the matching service.

pub mod bitly;
pub mod health;
pub mod mailchimp;
pub mod ticket_tailor;

pub use bitly::bitly_handler;
pub use health::health_handler;
pub use mailchimp::mailchimp_handler;
pub use ticket_tailor::ticket_tailor_handler;
