//! Authenticated HTTP access to the vendor APIs.
//!
//! Provides [`HttpUpstream`], one instance per vendor host, and the
//! [`AuthScheme`] each vendor expects.

mod http_upstream;

pub use http_upstream::{AuthScheme, HttpUpstream, encode_segment};
