//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::{
    BitlyService, MailchimpService, PipelineSettings, TicketTailorService,
};
use crate::config::Config;

/// Per-vendor services; `None` when the vendor's credentials are missing.
///
/// Built once at startup and never mutated, so cloning is cheap and requests
/// share nothing but these read-only handles.
#[derive(Clone, Default)]
pub struct AppState {
    pub bitly: Option<Arc<BitlyService>>,
    pub mailchimp: Option<Arc<MailchimpService>>,
    pub ticket_tailor: Option<Arc<TicketTailorService>>,
}

impl AppState {
    pub fn new(
        bitly: Option<Arc<BitlyService>>,
        mailchimp: Option<Arc<MailchimpService>>,
        ticket_tailor: Option<Arc<TicketTailorService>>,
    ) -> Self {
        Self {
            bitly,
            mailchimp,
            ticket_tailor,
        }
    }

    /// Builds a service for every vendor that has credentials configured.
    pub fn from_config(config: &Config) -> Self {
        let settings = PipelineSettings::from_config(config);

        let bitly = config
            .bitly_token
            .clone()
            .map(|token| Arc::new(BitlyService::from_token(token, settings)));
        let mailchimp = config
            .mailchimp
            .as_ref()
            .map(|mc| Arc::new(MailchimpService::from_config(mc, settings)));
        let ticket_tailor = config
            .ticket_tailor_key
            .clone()
            .map(|key| Arc::new(TicketTailorService::from_key(key, settings)));

        Self::new(bitly, mailchimp, ticket_tailor)
    }
}
