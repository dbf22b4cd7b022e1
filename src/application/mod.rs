//! Application layer: request parsing and the per-vendor pipelines.
//!
//! Services consume the [`crate::domain::upstream::UpstreamClient`] trait and
//! the pagination/enrichment/aggregation building blocks from
//! [`crate::domain`]; they never touch HTTP types directly.
//!
//! # Available Services
//!
//! - [`services::bitly_service::BitlyService`] - Recruitment link analytics
//! - [`services::mailchimp_service::MailchimpService`] - Audience growth and campaigns
//! - [`services::ticket_tailor_service::TicketTailorService`] - Events and ticket sales

pub mod action;
pub mod services;
