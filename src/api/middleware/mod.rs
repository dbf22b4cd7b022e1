//! HTTP middleware for request processing.
//!
//! Provides CORS handling and observability middleware.

pub mod cors;
pub mod tracing;
