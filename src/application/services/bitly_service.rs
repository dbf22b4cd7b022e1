//! Bitly recruitment link analytics.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;

use super::{PipelineSettings, essential_call, timestamp, to_json, upstream_error};
use crate::application::action::ActionRequest;
use crate::domain::aggregate::{GroupedCounts, RECRUITMENT_TAG_TERMS, any_tag_matches, percentage};
use crate::domain::deadline::Deadline;
use crate::domain::enrichment::{self, Enriched, enrich_all, fetch_secondary};
use crate::domain::pagination::{CursorStyle, ListingRequest, Paginator};
use crate::domain::shape;
use crate::domain::upstream::{Credential, QueryParams, UpstreamClient};
use crate::error::AppError;
use crate::infrastructure::http::{AuthScheme, HttpUpstream, encode_segment};

pub const BITLY_BASE_URL: &str = "https://api-ssl.bitly.com/v4";
pub const BITLY_ACTIONS: &[&str] = &["getRecruitmentLinks", "getLinkTrends"];

const LINKS_PAGE_SIZE: usize = 100;
const TOP_N: usize = 10;
const TREND_LINKS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitlyAction {
    RecruitmentLinks,
    LinkTrends,
}

impl FromStr for BitlyAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getRecruitmentLinks" => Ok(Self::RecruitmentLinks),
            "getLinkTrends" => Ok(Self::LinkTrends),
            _ => Err(AppError::invalid_action(BITLY_ACTIONS)),
        }
    }
}

/// A bitlink as returned by the group listing.
#[derive(Debug, Clone, PartialEq)]
struct Bitlink {
    id: String,
    long_url: Option<String>,
    title: Option<String>,
    tags: Vec<String>,
    created_at: Option<String>,
}

impl Bitlink {
    fn from_item(item: &Value) -> Option<Self> {
        let id = shape::id_of(item, "id")?;
        let tags = item
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id,
            long_url: shape::probe_str(item, &["long_url"]).map(str::to_string),
            title: shape::probe_str(item, &["title"]).map(str::to_string),
            tags,
            created_at: shape::probe_str(item, &["created_at"]).map(str::to_string),
        })
    }

    fn is_recruitment(&self) -> bool {
        any_tag_matches(&self.tags, RECRUITMENT_TAG_TERMS)
    }
}

/// Recruitment-tagged links of the first group.
struct RecruitmentListing {
    links: Vec<Bitlink>,
    truncated: bool,
    partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferrerStat {
    pub referrer: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryStat {
    pub country: String,
    pub clicks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    pub id: String,
    pub short_url: String,
    pub long_url: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub created: Option<String>,
    pub clicks: u64,
    pub referrers: Vec<ReferrerStat>,
    pub countries: Vec<CountryStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitmentLinksReport {
    pub links: Vec<LinkSummary>,
    pub total_clicks: u64,
    pub total_links: usize,
    pub top_referrers: Vec<ReferrerStat>,
    pub top_countries: Vec<CountryStat>,
    pub truncated: bool,
    pub partial: bool,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickPoint {
    pub date: Option<String>,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkTrend {
    pub id: String,
    pub title: String,
    pub data: Vec<ClickPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTrendsReport {
    pub link_trends: Vec<LinkTrend>,
    pub truncated: bool,
    pub partial: bool,
    pub last_updated: String,
}

/// Pipelines over the Bitly v4 API.
pub struct BitlyService {
    client: Arc<dyn UpstreamClient>,
    settings: PipelineSettings,
}

impl BitlyService {
    pub fn new(client: Arc<dyn UpstreamClient>, settings: PipelineSettings) -> Self {
        Self { client, settings }
    }

    /// Service backed by the real API with Bearer authentication.
    pub fn from_token(token: Credential, settings: PipelineSettings) -> Self {
        let client = HttpUpstream::new("bitly", BITLY_BASE_URL, token, AuthScheme::Bearer);
        Self::new(Arc::new(client), settings)
    }

    /// Runs the action named in `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidAction`] for an unknown action,
    /// [`AppError::Validation`] for an out-of-range `days`, and upstream
    /// errors from essential calls.
    pub async fn dispatch(&self, request: &ActionRequest) -> Result<Value, AppError> {
        let action: BitlyAction = request.action_name().unwrap_or_default().parse()?;
        let days = request.days_or_default()?;

        match action {
            BitlyAction::RecruitmentLinks => to_json(&self.recruitment_links(days).await?),
            BitlyAction::LinkTrends => to_json(&self.link_trends(days).await?),
        }
    }

    /// Click totals, referrers and countries for every recruitment link.
    pub async fn recruitment_links(&self, days: u32) -> Result<RecruitmentLinksReport, AppError> {
        let deadline = self.settings.start_deadline();
        let listing = self.recruitment_listing(deadline).await?;
        let links = &listing.links;
        tracing::info!(count = links.len(), "Found recruitment links");

        let (clicks, referrers, countries) = tokio::join!(
            self.enrich(links, "clicks/summary", days, deadline, |body| {
                shape::count_field(body, "total_clicks")
            }),
            self.enrich(links, "referrers", days, deadline, |body| {
                enrichment::metric_counts(body, shape::REFERRERS, shape::REFERRER_KEY)
            }),
            self.enrich(links, "countries", days, deadline, |body| {
                enrichment::metric_counts(body, shape::COUNTRIES, shape::COUNTRY_KEY)
            }),
        );
        let partial = listing.partial || clicks.partial || referrers.partial || countries.partial;

        let mut summaries: Vec<LinkSummary> = links
            .iter()
            .zip(clicks.values)
            .zip(referrers.values.into_iter().zip(countries.values))
            .map(|((link, clicks), (referrers, countries))| LinkSummary {
                id: link.id.clone(),
                short_url: format!("https://{}", link.id),
                long_url: link.long_url.clone(),
                title: link.title.clone().or_else(|| link.long_url.clone()),
                tags: link.tags.clone(),
                created: link.created_at.clone(),
                clicks: clicks.value_or_default(),
                referrers: referrers
                    .value_or_default()
                    .into_iter()
                    .map(|m| ReferrerStat {
                        referrer: m.value.unwrap_or_else(|| "direct".to_string()),
                        clicks: m.clicks,
                    })
                    .collect(),
                countries: countries
                    .value_or_default()
                    .into_iter()
                    .map(|m| CountryStat {
                        country: m.value.unwrap_or_else(|| "Unknown".to_string()),
                        clicks: m.clicks,
                        percentage: None,
                    })
                    .collect(),
            })
            .collect();

        let total_clicks: u64 = summaries.iter().map(|link| link.clicks).sum();

        let mut by_referrer = GroupedCounts::new("direct");
        let mut by_country = GroupedCounts::new("Unknown");
        for link in &summaries {
            for referrer in &link.referrers {
                by_referrer.add(Some(referrer.referrer.as_str()), referrer.clicks);
            }
            for country in &link.countries {
                by_country.add(Some(country.country.as_str()), country.clicks);
            }
        }

        let top_referrers = by_referrer
            .top_n(TOP_N)
            .into_iter()
            .map(|entry| ReferrerStat {
                referrer: entry.key,
                clicks: entry.count,
            })
            .collect();
        let top_countries = by_country
            .top_n(TOP_N)
            .into_iter()
            .map(|entry| CountryStat {
                percentage: Some(percentage(entry.count, total_clicks, 2)),
                country: entry.key,
                clicks: entry.count,
            })
            .collect();

        summaries.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        tracing::info!(total_clicks, partial, "Recruitment links aggregated");

        Ok(RecruitmentLinksReport {
            total_links: summaries.len(),
            links: summaries,
            total_clicks,
            top_referrers,
            top_countries,
            truncated: listing.truncated,
            partial,
            last_updated: timestamp(Utc::now()),
        })
    }

    /// Daily click series for the first few recruitment links.
    pub async fn link_trends(&self, days: u32) -> Result<LinkTrendsReport, AppError> {
        let deadline = self.settings.start_deadline();
        let listing = self.recruitment_listing(deadline).await?;
        let top: Vec<Bitlink> = listing.links.into_iter().take(TREND_LINKS).collect();

        let series = self
            .enrich(&top, "clicks", days, deadline, |body| {
                shape::probe_array(body, shape::CLICK_SERIES)
                    .iter()
                    .map(|point| ClickPoint {
                        date: shape::probe_str(point, &["date"]).map(str::to_string),
                        clicks: shape::count_field(point, "clicks"),
                    })
                    .collect::<Vec<_>>()
            })
            .await;
        let partial = listing.partial || series.partial;

        let link_trends = top
            .into_iter()
            .zip(series.values)
            .map(|(link, data)| LinkTrend {
                title: link.title.unwrap_or_else(|| link.id.clone()),
                id: link.id,
                data: data.value_or_default(),
            })
            .collect();

        Ok(LinkTrendsReport {
            link_trends,
            truncated: listing.truncated,
            partial,
            last_updated: timestamp(Utc::now()),
        })
    }

    async fn group_guid(&self, deadline: Deadline) -> Result<String, AppError> {
        let params = QueryParams::new();
        let response = essential_call(deadline, self.client.get("/groups", &params)).await?;
        if !response.ok {
            return Err(upstream_error(&response, "Failed to fetch Bitly groups"));
        }

        response
            .body
            .get("groups")
            .and_then(Value::as_array)
            .and_then(|groups| groups.first())
            .and_then(|group| shape::id_of(group, "guid"))
            .ok_or_else(|| AppError::not_found("No Bitly groups available", json!({})))
    }

    async fn recruitment_listing(&self, deadline: Deadline) -> Result<RecruitmentListing, AppError> {
        let guid = self.group_guid(deadline).await?;
        let request = ListingRequest {
            label: "bitlinks",
            path: format!("/groups/{}/bitlinks", encode_segment(&guid)),
            params: QueryParams::new(),
            page_size_param: "size",
            items: shape::BITLINKS,
            cursor: CursorStyle::SearchAfter,
            id_field: "id",
        };

        let paginated = Paginator::new(LINKS_PAGE_SIZE, self.settings.max_pages)
            .with_deadline(deadline)
            .collect(self.client.as_ref(), &request)
            .await?;

        let links = paginated
            .items
            .iter()
            .filter_map(Bitlink::from_item)
            .filter(Bitlink::is_recruitment)
            .collect();

        Ok(RecruitmentListing {
            links,
            truncated: paginated.truncated,
            partial: paginated.partial,
        })
    }

    /// One secondary resource for every link, concurrently.
    async fn enrich<T>(
        &self,
        links: &[Bitlink],
        resource: &str,
        days: u32,
        deadline: Deadline,
        extract: impl Fn(&Value) -> T + Copy,
    ) -> Enriched<T> {
        let params = QueryParams::new().with("unit", "day").with("units", days);
        let client = self.client.as_ref();

        enrich_all(links, Some(deadline), |link| {
            let path = format!("/bitlinks/{}/{resource}", encode_segment(&link.id));
            let params = &params;
            async move { fetch_secondary(client, &path, params, extract).await }
        })
        .await
    }
}
