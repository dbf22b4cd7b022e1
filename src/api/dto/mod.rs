//! Data Transfer Objects for API requests and responses.
//!
//! Integration responses are built by the services themselves; this module
//! holds the request body shared by every integration and the health report.

pub mod health;

pub use crate::application::action::ActionRequest;
