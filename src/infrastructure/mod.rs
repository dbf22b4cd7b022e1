//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`http`] - reqwest-backed [`crate::domain::upstream::UpstreamClient`] for vendor APIs

pub mod http;
