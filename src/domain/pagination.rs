//! Cursor-driven collection of listing endpoints.
//!
//! A [`Paginator`] walks one [`ListingRequest`] page by page, strictly in
//! sequence, deduplicating items by id. It stops at the first of:
//!
//! 1. a page shorter than the requested page size;
//! 2. a page without a continuation token;
//! 3. a page whose items were all seen before (guards against a cursor the
//!    upstream keeps echoing back);
//! 4. the page ceiling, which marks the result as truncated.
//!
//! What happens on a failed page is governed by [`FailurePolicy`].

use serde_json::Value;
use std::collections::HashSet;

use crate::domain::deadline::Deadline;
use crate::domain::shape::{self, Probe};
use crate::domain::upstream::{QueryParams, UpstreamClient};
use crate::error::AppError;

/// How a listing endpoint advertises its next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    /// Token in `pagination.search_after`, sent back as `search_after`.
    SearchAfter,
    /// Numeric `offset`, advanced by the number of items returned and
    /// exhausted once `total_items` is reached.
    Offset,
    /// Last item id sent as `starting_after` while `links.next` is set.
    StartingAfter,
}

impl CursorStyle {
    pub fn param(&self) -> &'static str {
        match self {
            CursorStyle::SearchAfter => "search_after",
            CursorStyle::Offset => "offset",
            CursorStyle::StartingAfter => "starting_after",
        }
    }

    fn next_cursor(
        &self,
        body: &Value,
        items: &[Value],
        current: Option<&str>,
        id_field: &str,
    ) -> Option<String> {
        match self {
            CursorStyle::SearchAfter => shape::path(body, "pagination.search_after")
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
            CursorStyle::Offset => {
                let offset: u64 = current.and_then(|c| c.parse().ok()).unwrap_or(0);
                let next = offset + items.len() as u64;
                match body.get("total_items").and_then(Value::as_u64) {
                    Some(total) if next >= total => None,
                    _ => Some(next.to_string()),
                }
            }
            CursorStyle::StartingAfter => {
                let has_next = shape::path(body, "links.next")
                    .and_then(Value::as_str)
                    .is_some_and(|next| !next.is_empty());
                if has_next {
                    items.last().and_then(|item| shape::id_of(item, id_field))
                } else {
                    None
                }
            }
        }
    }
}

/// Description of one listing endpoint.
#[derive(Debug, Clone)]
pub struct ListingRequest {
    /// Used in log lines and error messages.
    pub label: &'static str,
    pub path: String,
    pub params: QueryParams,
    /// Query parameter carrying the page size (`size`, `count`, `limit`).
    pub page_size_param: &'static str,
    pub items: &'static [Probe],
    pub cursor: CursorStyle,
    pub id_field: &'static str,
}

/// One parsed listing response.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub items: Vec<Value>,
    pub cursor: Option<String>,
}

impl ListingPage {
    pub fn parse(body: &Value, request: &ListingRequest, current: Option<&str>) -> Self {
        let items = shape::probe_array(body, request.items);
        let cursor = request
            .cursor
            .next_cursor(body, &items, current, request.id_field);
        Self { items, cursor }
    }
}

/// What to do when a page cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Surface the failure; accumulated items are discarded.
    Abort,
    /// Log, stop, and return what was accumulated with `partial` set.
    BestEffort,
}

/// Accumulated items across all fetched pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paginated {
    pub items: Vec<Value>,
    pub pages_fetched: usize,
    /// The page ceiling stopped collection while more pages were available.
    pub truncated: bool,
    /// A page failed under [`FailurePolicy::BestEffort`] or the deadline fired.
    pub partial: bool,
}

#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: usize,
    max_pages: usize,
    policy: FailurePolicy,
    deadline: Option<Deadline>,
}

impl Paginator {
    pub fn new(page_size: usize, max_pages: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
            policy: FailurePolicy::Abort,
            deadline: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetches every page of `request`.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`], returns [`AppError::Upstream`] for a
    /// non-200 page and [`AppError::Internal`] for transport or parse errors.
    /// Never errors under [`FailurePolicy::BestEffort`].
    pub async fn collect(
        &self,
        client: &dyn UpstreamClient,
        request: &ListingRequest,
    ) -> Result<Paginated, AppError> {
        let mut result = Paginated::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut params = request.params.clone();
        params.set(request.page_size_param, self.page_size);
        let mut cursor: Option<String> = None;

        loop {
            if let Some(ref c) = cursor {
                params.set(request.cursor.param(), c);
            }

            let fetch = client.get(&request.path, &params);
            let fetched = match self.deadline {
                Some(deadline) => match deadline.run(fetch).await {
                    Some(fetched) => fetched,
                    None => {
                        tracing::warn!(
                            listing = request.label,
                            pages = result.pages_fetched,
                            "Deadline reached while paginating"
                        );
                        result.partial = true;
                        break;
                    }
                },
                None => fetch.await,
            };

            let failure = match fetched {
                Ok(response) if response.ok => {
                    result.pages_fetched += 1;
                    let page = ListingPage::parse(&response.body, request, cursor.as_deref());
                    let returned = page.items.len();
                    let mut fresh = 0;

                    for item in page.items {
                        let is_new = match shape::id_of(&item, request.id_field) {
                            Some(id) => seen.insert(id),
                            None => true,
                        };
                        if is_new {
                            fresh += 1;
                            result.items.push(item);
                        }
                    }

                    if returned < self.page_size {
                        break;
                    }
                    let Some(next) = page.cursor else {
                        break;
                    };
                    if fresh == 0 {
                        tracing::warn!(
                            listing = request.label,
                            "Page repeated previously seen items, stopping"
                        );
                        break;
                    }
                    if result.pages_fetched >= self.max_pages {
                        tracing::warn!(
                            listing = request.label,
                            max_pages = self.max_pages,
                            "Page ceiling reached, result truncated"
                        );
                        result.truncated = true;
                        break;
                    }

                    cursor = Some(next);
                    continue;
                }
                Ok(response) => AppError::upstream(
                    response.status,
                    shape::error_message(&response.body)
                        .unwrap_or_else(|| format!("Failed to fetch {}", request.label)),
                    serde_json::json!({ "details": response.body }),
                ),
                Err(e) => AppError::from(e),
            };

            match self.policy {
                FailurePolicy::Abort => return Err(failure),
                FailurePolicy::BestEffort => {
                    tracing::warn!(
                        listing = request.label,
                        pages = result.pages_fetched,
                        error = %failure,
                        "Listing failed, keeping partial result"
                    );
                    result.partial = true;
                    break;
                }
            }
        }

        tracing::debug!(
            listing = request.label,
            pages = result.pages_fetched,
            items = result.items.len(),
            "Listing collected"
        );

        Ok(result)
    }
}
