use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::event::RawEvent;
use crate::models::repository::RawRepo;
use crate::services::github::{decode, endpoints, Forwarder, GitHubError, ProxyRequest};

/// GitHub serves at most this many events per feed and answers 422 past it
pub const EVENT_FEED_LIMIT: usize = 300;

/// How one paginated resource is walked
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagedResource {
    pub endpoint: &'static str,
    pub page_size: u32,
    /// Safety valve, independent of what the API reports
    pub max_pages: u32,
    /// Upstream cap on total items; no page is requested beyond it
    pub max_items: Option<usize>,
    pub timeout: Duration,
}

impl PagedResource {
    pub fn repositories(timeout: Duration) -> Self {
        Self {
            endpoint: endpoints::REPOSITORIES,
            page_size: 100,
            max_pages: 10,
            max_items: None,
            timeout,
        }
    }

    pub fn events(timeout: Duration) -> Self {
        Self {
            endpoint: endpoints::EVENTS,
            page_size: 100,
            max_pages: 30,
            max_items: Some(EVENT_FEED_LIMIT),
            timeout,
        }
    }

    /// Rough signal only, so smaller pages
    pub fn received_events(timeout: Duration) -> Self {
        Self {
            endpoint: endpoints::RECEIVED_EVENTS,
            page_size: 30,
            max_pages: 10,
            max_items: Some(EVENT_FEED_LIMIT),
            timeout,
        }
    }

    pub fn page_endpoint(&self, page: u32) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}per_page={}&page={}",
            self.endpoint, separator, self.page_size, page
        )
    }
}

/// Walk pages 1..=max_pages strictly in order.
///
/// Stops on an empty page, a short page, the page ceiling, the item
/// cap, or when `reached_cutoff` says the page already goes far enough back.
/// Any failed page fails the whole fetch.
pub async fn fetch_pages<T, F>(
    forwarder: &dyn Forwarder,
    request: &ProxyRequest,
    resource: &PagedResource,
    reached_cutoff: F,
) -> Result<Vec<T>, GitHubError>
where
    T: DeserializeOwned + Send,
    F: Fn(&[T]) -> bool + Send + Sync,
{
    let mut items = Vec::new();
    let mut page = 1;

    while page <= resource.max_pages {
        let page_request = request.with_endpoint(resource.page_endpoint(page));
        let body = forwarder.forward(&page_request, resource.timeout).await?;
        let batch: Vec<T> = decode(body, resource.endpoint)?;
        let fetched = batch.len();

        log::debug!("📥 Fetched {} items from {} (page {})", fetched, resource.endpoint, page);

        if fetched == 0 {
            break;
        }

        let last_page = fetched < resource.page_size as usize || reached_cutoff(&batch);
        items.extend(batch);

        let capped = resource.max_items.is_some_and(|cap| items.len() >= cap);
        if let Some(cap) = resource.max_items {
            items.truncate(cap);
        }

        if last_page || capped {
            break;
        }
        page += 1;
    }

    log::info!(
        "📊 {} items from {} for {} ({} pages)",
        items.len(),
        resource.endpoint,
        request.username,
        page.min(resource.max_pages)
    );

    Ok(items)
}

pub async fn fetch_repositories(
    forwarder: &dyn Forwarder,
    request: &ProxyRequest,
    resource: &PagedResource,
) -> Result<Vec<RawRepo>, GitHubError> {
    fetch_pages(forwarder, request, resource, |_: &[RawRepo]| false).await
}

/// Event feeds are newest-first, so once a page reaches back before
/// `since` there is nothing older worth fetching
pub async fn fetch_events(
    forwarder: &dyn Forwarder,
    request: &ProxyRequest,
    resource: &PagedResource,
    since: DateTime<Utc>,
) -> Result<Vec<RawEvent>, GitHubError> {
    fetch_pages(forwarder, request, resource, |page: &[RawEvent]| {
        page.iter()
            .map(|event| event.created_at)
            .min()
            .is_some_and(|oldest| oldest < since)
    })
    .await
}
