//! Command-line runner for the dashboard pipelines.
//!
//! Runs the same service code as the HTTP endpoints, without the server,
//! and prints the JSON payload. Handy for checking credentials or looking
//! at raw numbers.
//!
//! # Usage
//!
//! ```bash
//! # Recruitment links over the last week
//! cargo run --bin dashctl -- bitly getRecruitmentLinks --days 7
//!
//! # Audience growth over 8 weeks
//! cargo run --bin dashctl -- mailchimp getLeadStats --weeks 8
//!
//! # One event with its tickets
//! cargo run --bin dashctl -- ticket-tailor getEventDetails --event-id ev_123
//! ```
//!
//! # Environment Variables
//!
//! Same as the server: `BITLY_ACCESS_TOKEN`, `MAILCHIMP_API_KEY`,
//! `MAILCHIMP_SERVER_PREFIX`, `MAILCHIMP_AUDIENCE_ID`, `TICKET_TAILOR_API_KEY`,
//! `PIPELINE_DEADLINE_SECS`, `MAX_LISTING_PAGES`. A `.env` file is honored.

use dashboard_proxy::application::action::ActionRequest;
use dashboard_proxy::config::load_from_env;
use dashboard_proxy::error::AppError;
use dashboard_proxy::state::AppState;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use serde_json::Value;

/// Runs one dashboard action and prints the result.
#[derive(Parser)]
#[command(name = "dashctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Integration to call
    integration: Integration,

    /// Action name, e.g. getRecruitmentLinks
    action: String,

    /// Reporting window in days (Bitly)
    #[arg(long)]
    days: Option<u32>,

    /// Number of weekly buckets (Mailchimp)
    #[arg(long)]
    weeks: Option<u32>,

    /// Earliest event start (Ticket Tailor)
    #[arg(long)]
    start_date: Option<String>,

    /// Latest event start (Ticket Tailor)
    #[arg(long)]
    end_date: Option<String>,

    /// Event id for getEventDetails (Ticket Tailor)
    #[arg(long)]
    event_id: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Integration {
    Bitly,
    Mailchimp,
    TicketTailor,
}

impl Cli {
    fn request(&self) -> ActionRequest {
        ActionRequest {
            action: Some(self.action.clone()),
            days: self.days,
            weeks: self.weeks,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            event_id: self.event_id.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_from_env().context("Invalid configuration")?;
    let state = AppState::from_config(&config);

    match run(&cli, &state).await {
        Ok(payload) => {
            let pretty = serde_json::to_string_pretty(&payload)?;
            println!("{pretty}");
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{} {}",
                format!("✗ {}", e.status()).red().bold(),
                e.message().red()
            );
            std::process::exit(1);
        }
    }
}

/// Dispatches to the selected integration.
async fn run(cli: &Cli, state: &AppState) -> Result<Value, AppError> {
    let request = cli.request();

    match cli.integration {
        Integration::Bitly => {
            let service = state
                .bitly
                .as_ref()
                .ok_or_else(|| AppError::not_configured("Bitly"))?;
            service.dispatch(&request).await
        }
        Integration::Mailchimp => {
            let service = state
                .mailchimp
                .as_ref()
                .ok_or_else(|| AppError::not_configured("Mailchimp"))?;
            service.dispatch(&request).await
        }
        Integration::TicketTailor => {
            let service = state
                .ticket_tailor
                .as_ref()
                .ok_or_else(|| AppError::not_configured("Ticket Tailor API key"))?;
            service.dispatch(&request).await
        }
    }
}
