//! Mailchimp audience growth and campaign performance.
//!
//! Growth history is only available per month, so weekly figures are an
//! approximation: each week takes a quarter of the month its first day falls
//! in.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use super::{PipelineSettings, essential_call, timestamp, to_json, upstream_error};
use crate::application::action::ActionRequest;
use crate::config::MailchimpConfig;
use crate::domain::aggregate::{percentage, round_to};
use crate::domain::deadline::Deadline;
use crate::domain::enrichment::{DegradeReason, Enrichment, fetch_secondary};
use crate::domain::pagination::{CursorStyle, ListingRequest, Paginator};
use crate::domain::shape;
use crate::domain::upstream::{QueryParams, UpstreamClient};
use crate::error::AppError;
use crate::infrastructure::http::{AuthScheme, HttpUpstream, encode_segment};

pub const MAILCHIMP_ACTIONS: &[&str] = &["getLeadStats", "getCampaigns"];

const MEMBERS_PAGE_SIZE: usize = 1000;
const MEMBERS_MAX_PAGES: usize = 10;
const CAMPAIGNS_FETCHED: usize = 100;
const CAMPAIGNS_SHOWN: usize = 20;
const APPLICANT_TAG: &str = "applicant";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailchimpAction {
    LeadStats,
    Campaigns,
}

impl FromStr for MailchimpAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getLeadStats" => Ok(Self::LeadStats),
            "getCampaigns" => Ok(Self::Campaigns),
            _ => Err(AppError::invalid_action(MAILCHIMP_ACTIONS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPoint {
    pub date: String,
    pub subscribed: u64,
    pub unsubscribed: u64,
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStatsReport {
    pub leads: u64,
    pub applicants: usize,
    pub conversion_rate: f64,
    pub this_week_subscribed: u64,
    pub weekly_change: f64,
    pub weekly_data: Vec<WeeklyPoint>,
    pub truncated: bool,
    pub partial: bool,
    pub last_updated: String,
}

/// One sent campaign. Field names follow Mailchimp's report summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummary {
    pub id: Option<String>,
    pub title: String,
    pub subject: String,
    pub send_time: String,
    pub emails_sent: u64,
    pub opens: u64,
    pub open_rate: f64,
    pub clicks: u64,
    pub click_rate: f64,
    pub unique_opens: u64,
    pub unique_clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignsReport {
    pub campaigns: Vec<CampaignSummary>,
    pub total: usize,
    pub last_updated: String,
}

/// Pipelines over the Mailchimp Marketing 3.0 API for one audience.
pub struct MailchimpService {
    client: Arc<dyn UpstreamClient>,
    audience_id: String,
    settings: PipelineSettings,
}

impl MailchimpService {
    pub fn new(
        client: Arc<dyn UpstreamClient>,
        audience_id: impl Into<String>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            audience_id: audience_id.into(),
            settings,
        }
    }

    /// Service for the data center named by the server prefix.
    pub fn from_config(config: &MailchimpConfig, settings: PipelineSettings) -> Self {
        let base_url = format!("https://{}.api.mailchimp.com/3.0", config.server_prefix);
        let client = HttpUpstream::new(
            "mailchimp",
            base_url,
            config.api_key.clone(),
            AuthScheme::Bearer,
        );
        Self::new(Arc::new(client), config.audience_id.clone(), settings)
    }

    /// Runs the action named in `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidAction`] for an unknown action,
    /// [`AppError::Validation`] for an out-of-range `weeks`, and upstream
    /// errors from essential calls.
    pub async fn dispatch(&self, request: &ActionRequest) -> Result<Value, AppError> {
        let action: MailchimpAction = request.action_name().unwrap_or_default().parse()?;

        match action {
            MailchimpAction::LeadStats => {
                let weeks = request.weeks_or_default()?;
                to_json(&self.lead_stats(weeks, Utc::now()).await?)
            }
            MailchimpAction::Campaigns => to_json(&self.campaigns().await?),
        }
    }

    fn list_path(&self, suffix: &str) -> String {
        format!("/lists/{}{suffix}", encode_segment(&self.audience_id))
    }

    /// Audience size, applicant conversion and weekly growth ending at `now`.
    pub async fn lead_stats(&self, weeks: u32, now: DateTime<Utc>) -> Result<LeadStatsReport, AppError> {
        let deadline = self.settings.start_deadline();

        let path = self.list_path("");
        let params = QueryParams::new();
        let response = essential_call(deadline, self.client.get(&path, &params)).await?;
        if !response.ok {
            return Err(upstream_error(&response, "Failed to fetch members"));
        }
        let leads = shape::path(&response.body, "stats.member_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let request = ListingRequest {
            label: "members",
            path: self.list_path("/members"),
            params: QueryParams::new().with("status", "subscribed"),
            page_size_param: "count",
            items: shape::MEMBERS,
            cursor: CursorStyle::Offset,
            id_field: "id",
        };
        let members = Paginator::new(
            MEMBERS_PAGE_SIZE,
            self.settings.max_pages.min(MEMBERS_MAX_PAGES),
        )
        .with_deadline(deadline)
        .collect(self.client.as_ref(), &request)
        .await?;

        let applicants = members.items.iter().filter(|m| is_applicant(m)).count();
        let conversion_rate = percentage(applicants as u64, leads, 1);

        let history = self.growth_history(deadline).await;
        let partial = members.partial || matches!(history, Enrichment::Degraded(DegradeReason::Deadline));
        let weekly_data = weekly_growth(&history.value_or_default(), weeks, now);

        let this_week = weekly_data.last();
        let this_week_subscribed = this_week.map(|w| w.subscribed).unwrap_or(0);
        let this_net = this_week.map(|w| w.net).unwrap_or(0);
        let last_net = weekly_data
            .len()
            .checked_sub(2)
            .map(|i| weekly_data[i].net)
            .unwrap_or(0);
        let weekly_change = if last_net == 0 {
            0.0
        } else {
            round_to((this_net - last_net) as f64 / last_net.abs() as f64 * 100.0, 1)
        };

        tracing::info!(leads, applicants, partial, "Lead stats aggregated");

        Ok(LeadStatsReport {
            leads,
            applicants,
            conversion_rate,
            this_week_subscribed,
            weekly_change,
            weekly_data,
            truncated: members.truncated,
            partial,
            last_updated: timestamp(now),
        })
    }

    async fn growth_history(&self, deadline: Deadline) -> Enrichment<Vec<Value>> {
        let path = self.list_path("/growth-history");
        let params = QueryParams::new().with("count", 24);
        let fetch = fetch_secondary(self.client.as_ref(), &path, &params, |body| {
            shape::probe_array(body, shape::GROWTH_HISTORY)
        });

        deadline
            .run(fetch)
            .await
            .unwrap_or(Enrichment::Degraded(DegradeReason::Deadline))
    }

    /// The most recent sent campaigns for the audience.
    pub async fn campaigns(&self) -> Result<CampaignsReport, AppError> {
        let deadline = self.settings.start_deadline();
        let params = QueryParams::new()
            .with("count", CAMPAIGNS_FETCHED)
            .with("status", "sent")
            .with("list_id", &self.audience_id)
            .with("sort_field", "send_time")
            .with("sort_dir", "DESC");

        let response = essential_call(deadline, self.client.get("/campaigns", &params)).await?;
        if !response.ok {
            return Err(upstream_error(&response, "Failed to fetch campaigns"));
        }

        let campaigns: Vec<CampaignSummary> = shape::probe_array(&response.body, shape::CAMPAIGNS)
            .iter()
            .filter(|c| c.get("status").and_then(Value::as_str) == Some("sent"))
            .filter_map(campaign_summary)
            .take(CAMPAIGNS_SHOWN)
            .collect();

        Ok(CampaignsReport {
            total: campaigns.len(),
            campaigns,
            last_updated: timestamp(Utc::now()),
        })
    }
}

fn is_applicant(member: &Value) -> bool {
    member
        .get("tags")
        .and_then(Value::as_array)
        .is_some_and(|tags| {
            tags.iter()
                .filter_map(|tag| tag.get("name").and_then(Value::as_str))
                .any(|name| name.eq_ignore_ascii_case(APPLICANT_TAG))
        })
}

/// `None` for campaigns without a send time.
fn campaign_summary(campaign: &Value) -> Option<CampaignSummary> {
    let send_time = shape::probe_str(campaign, &["send_time"])?.to_string();
    let empty = Value::Null;
    let report = campaign.get("report_summary").unwrap_or(&empty);
    let emails_sent = shape::count_field(report, "emails_sent");
    let opens = shape::count_field(report, "opens");
    let clicks = shape::count_field(report, "clicks");

    Some(CampaignSummary {
        id: shape::id_of(campaign, "id"),
        title: shape::probe_path_str(campaign, &["settings.title"])
            .unwrap_or("Untitled Campaign")
            .to_string(),
        subject: shape::probe_path_str(campaign, &["settings.subject_line"])
            .unwrap_or_default()
            .to_string(),
        send_time,
        emails_sent,
        opens,
        open_rate: percentage(opens, emails_sent, 1),
        clicks,
        click_rate: percentage(clicks, emails_sent, 1),
        unique_opens: shape::count_field(report, "unique_opens"),
        unique_clicks: shape::count_field(report, "subscriber_clicks"),
    })
}

/// Spreads monthly growth records over `weeks` weeks ending at `now`.
///
/// Oldest week first. Week `i` (counting back from the newest, `0`) starts
/// at midnight UTC `i * 7 + 7` days before `now`. Weeks whose month has no
/// record are zero.
fn weekly_growth(history: &[Value], weeks: u32, now: DateTime<Utc>) -> Vec<WeeklyPoint> {
    (0..weeks)
        .rev()
        .map(|i| {
            let start = (now - TimeDelta::days(i64::from(i) * 7 + 7))
                .date_naive()
                .and_time(NaiveTime::MIN)
                .and_utc();
            let month = start.format("%Y-%m").to_string();

            let record = history.iter().find(|h| {
                shape::probe_str(h, &["month"]).is_some_and(|m| m.starts_with(&month))
            });
            let (subscribed, unsubscribed) = record
                .map(|h| {
                    (
                        quarter(shape::count_field(h, "subscribed")),
                        quarter(shape::count_field(h, "unsubscribed")),
                    )
                })
                .unwrap_or((0, 0));

            WeeklyPoint {
                date: timestamp(start),
                subscribed,
                unsubscribed,
                net: subscribed as i64 - unsubscribed as i64,
            }
        })
        .collect()
}

fn quarter(monthly: u64) -> u64 {
    (monthly as f64 / 4.0).round() as u64
}
