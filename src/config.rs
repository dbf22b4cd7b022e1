//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup, validated, and then passed
//! explicitly to every service through [`crate::state::AppState`]. Nothing
//! here is mutated after startup.
//!
//! ## Vendor credentials
//!
//! ```bash
//! export BITLY_ACCESS_TOKEN="..."
//!
//! export MAILCHIMP_API_KEY="...-us21"
//! export MAILCHIMP_SERVER_PREFIX="us21"
//! export MAILCHIMP_AUDIENCE_ID="a1b2c3d4e5"
//!
//! export TICKET_TAILOR_API_KEY="sk_..."
//! ```
//!
//! Every credential is optional at startup. A missing credential makes the
//! matching endpoint answer `500 {"error": "<service> not configured"}`.
//! Mailchimp counts as configured only when all three of its values are set.
//!
//! ## Optional Variables
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `PIPELINE_DEADLINE_SECS` - Time budget per request (default: 20, range: 1-300)
//! - `MAX_LISTING_PAGES` - Page ceiling for primary listings (default: 20, range: 1-1000)

use anyhow::Result;
use std::env;
use std::time::Duration;

use crate::domain::upstream::Credential;

/// Mailchimp needs a data-center prefix and an audience next to the key.
#[derive(Debug, Clone)]
pub struct MailchimpConfig {
    pub api_key: Credential,
    pub server_prefix: String,
    pub audience_id: String,
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    pub bitly_token: Option<Credential>,
    pub mailchimp: Option<MailchimpConfig>,
    pub ticket_tailor_key: Option<Credential>,
    /// Budget for one pipeline; outstanding upstream calls are abandoned after it.
    pub pipeline_deadline_secs: u64,
    /// Ceiling on pages fetched from any primary listing.
    pub max_listing_pages: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let bitly_token = Self::load_credential("BITLY_ACCESS_TOKEN");
        let mailchimp = Self::load_mailchimp();
        let ticket_tailor_key = Self::load_credential("TICKET_TAILOR_API_KEY");

        let pipeline_deadline_secs = Self::load_number("PIPELINE_DEADLINE_SECS", 20)?;
        let max_listing_pages = Self::load_number("MAX_LISTING_PAGES", 20)?;

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            bitly_token,
            mailchimp,
            ticket_tailor_key,
            pipeline_deadline_secs,
            max_listing_pages,
        })
    }

    fn load_credential(name: &str) -> Option<Credential> {
        env::var(name).ok().and_then(Credential::new)
    }

    fn load_non_empty(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Loads Mailchimp settings; `None` unless key, server prefix and audience are all set.
    fn load_mailchimp() -> Option<MailchimpConfig> {
        let api_key = Self::load_credential("MAILCHIMP_API_KEY")?;
        let server_prefix = Self::load_non_empty("MAILCHIMP_SERVER_PREFIX")?;
        let audience_id = Self::load_non_empty("MAILCHIMP_AUDIENCE_ID")?;

        Some(MailchimpConfig {
            api_key,
            server_prefix,
            audience_id,
        })
    }

    fn load_number<T>(name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::load_non_empty(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("{name} must be a number, got '{raw}': {e}")),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `log_format` is not `text` or `json`
    /// - `listen_addr` is invalid
    /// - `pipeline_deadline_secs` is outside 1-300
    /// - `max_listing_pages` is outside 1-1000
    /// - the Mailchimp server prefix contains anything but letters and digits
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if !(1..=300).contains(&self.pipeline_deadline_secs) {
            anyhow::bail!(
                "PIPELINE_DEADLINE_SECS must be between 1 and 300, got {}",
                self.pipeline_deadline_secs
            );
        }

        if !(1..=1000).contains(&self.max_listing_pages) {
            anyhow::bail!(
                "MAX_LISTING_PAGES must be between 1 and 1000, got {}",
                self.max_listing_pages
            );
        }

        // The prefix becomes part of the API hostname
        if let Some(ref mailchimp) = self.mailchimp
            && !mailchimp
                .server_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            anyhow::bail!(
                "MAILCHIMP_SERVER_PREFIX must be alphanumeric (e.g. 'us21'), got '{}'",
                mailchimp.server_prefix
            );
        }

        Ok(())
    }

    pub fn pipeline_deadline(&self) -> Duration {
        Duration::from_secs(self.pipeline_deadline_secs)
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Bitly: {}", describe(self.bitly_token.as_ref()));
        match self.mailchimp {
            Some(ref mc) => tracing::info!(
                "  Mailchimp: {} (server {}, audience {})",
                mc.api_key,
                mc.server_prefix,
                mc.audience_id
            ),
            None => tracing::info!("  Mailchimp: not configured"),
        }
        tracing::info!(
            "  Ticket Tailor: {}",
            describe(self.ticket_tailor_key.as_ref())
        );
        tracing::info!("  Pipeline deadline: {}s", self.pipeline_deadline_secs);
        tracing::info!("  Max listing pages: {}", self.max_listing_pages);
    }
}

fn describe(credential: Option<&Credential>) -> String {
    credential
        .map(|c| c.masked())
        .unwrap_or_else(|| "not configured".to_string())
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if a variable does not parse or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "BITLY_ACCESS_TOKEN",
        "MAILCHIMP_API_KEY",
        "MAILCHIMP_SERVER_PREFIX",
        "MAILCHIMP_AUDIENCE_ID",
        "TICKET_TAILOR_API_KEY",
        "PIPELINE_DEADLINE_SECS",
        "MAX_LISTING_PAGES",
    ];

    fn clear_env() {
        // SAFETY: Tests touching the environment are run serially via #[serial]
        unsafe {
            for var in VARS {
                env::remove_var(var);
            }
        }
    }

    fn base_config() -> Config {
        Config {
            listen_addr: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            bitly_token: None,
            mailchimp: None,
            ticket_tailor_key: None,
            pipeline_deadline_secs: 20,
            max_listing_pages: 20,
        }
    }

    #[test]
    fn test_config_validation() {
        let mut config = base_config();
        assert!(config.validate().is_ok());

        config.log_format = "invalid".to_string();
        assert!(config.validate().is_err());
        config.log_format = "json".to_string();
        assert!(config.validate().is_ok());

        config.listen_addr = "3000".to_string();
        assert!(config.validate().is_err());
        config.listen_addr = "0.0.0.0:3000".to_string();

        config.pipeline_deadline_secs = 0;
        assert!(config.validate().is_err());
        config.pipeline_deadline_secs = 20;

        config.max_listing_pages = 0;
        assert!(config.validate().is_err());
        config.max_listing_pages = 20;

        config.mailchimp = Some(MailchimpConfig {
            api_key: Credential::new("key").unwrap(),
            server_prefix: "evil.com/".to_string(),
            audience_id: "abc".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_missing_credentials_are_none() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert!(config.bitly_token.is_none());
        assert!(config.mailchimp.is_none());
        assert!(config.ticket_tailor_key.is_none());
        assert_eq!(config.pipeline_deadline_secs, 20);
        assert_eq!(config.max_listing_pages, 20);
    }

    #[test]
    #[serial]
    fn test_empty_credential_counts_as_missing() {
        clear_env();
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("BITLY_ACCESS_TOKEN", "");
            env::set_var("TICKET_TAILOR_API_KEY", "sk_live_123");
        }

        let config = Config::from_env().unwrap();
        assert!(config.bitly_token.is_none());
        assert_eq!(
            config.ticket_tailor_key.as_ref().map(|c| c.expose()),
            Some("sk_live_123")
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_mailchimp_requires_all_values() {
        clear_env();
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("MAILCHIMP_API_KEY", "abc-us21");
            env::set_var("MAILCHIMP_SERVER_PREFIX", "us21");
        }
        assert!(Config::from_env().unwrap().mailchimp.is_none());

        unsafe {
            env::set_var("MAILCHIMP_AUDIENCE_ID", "list1");
        }
        let mailchimp = Config::from_env().unwrap().mailchimp.unwrap();
        assert_eq!(mailchimp.server_prefix, "us21");
        assert_eq!(mailchimp.audience_id, "list1");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_error() {
        clear_env();
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("PIPELINE_DEADLINE_SECS", "soon");
        }
        assert!(Config::from_env().is_err());

        unsafe {
            env::set_var("PIPELINE_DEADLINE_SECS", "9");
        }
        assert_eq!(Config::from_env().unwrap().pipeline_deadline_secs, 9);

        clear_env();
    }
}
