//! Cursor-following pagination over the upstream's private listings.
//!
//! Each page names the next one in its `nextUrl` field. Pages are fetched
//! strictly one after another with the caller's cookies and never cached.

use std::pin::pin;

use anyhow::{Context, Result};
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::{header, Client, Url};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::AuthCookieJar;
use crate::config::UpstreamConfig;
use crate::models::Page;

/// A parsed page together with the JSON body it came from
#[derive(Debug, Clone)]
pub struct FetchedPage<P> {
    pub page: P,
    pub raw: Value,
}

/// Everything gathered from one paginated listing.
///
/// `total` is whatever the *last* page reported. The upstream does not
/// guarantee it matches the number of items collected.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
    pub items: T,
    pub total: i64,
    pub raw_pages: Vec<Value>,
}

impl<T> FetchResult<T> {
    pub fn map_items<U>(self, f: impl FnOnce(T) -> U) -> FetchResult<U> {
        FetchResult {
            items: f(self.items),
            total: self.total,
            raw_pages: self.raw_pages,
        }
    }
}

/// Serialized as `[items, total, raw_pages]`, the shape the web front end reads.
impl<T: Serialize> Serialize for FetchResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.items)?;
        tuple.serialize_element(&self.total)?;
        tuple.serialize_element(&self.raw_pages)?;
        tuple.end()
    }
}

/// Follows `nextUrl` cursors until the upstream stops sending one.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct PaginatedFetcher {
    client: Client,
    max_pages: usize,
}

impl PaginatedFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            max_pages: config.max_pages.max(1),
        })
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Lazily fetch pages starting at `initial`.
    ///
    /// Nothing is requested until the stream is polled, and dropping it
    /// between pages stops the fetch. The stream ends after the first page
    /// without a cursor, or after the first error.
    pub fn pages<'a, P>(
        &'a self,
        initial: Url,
        cookies: &'a AuthCookieJar,
    ) -> impl Stream<Item = Result<FetchedPage<P>, ApiError>> + 'a
    where
        P: Page + 'a,
    {
        let origin = initial.origin();
        stream::try_unfold(Some((initial, 0usize)), move |state| {
            let origin = origin.clone();
            async move {
                let Some((url, fetched)) = state else {
                    return Ok(None);
                };
                if fetched >= self.max_pages {
                    warn!(max_pages = self.max_pages, "Page limit reached, aborting fetch");
                    return Err(ApiError::PageLimitExceeded(self.max_pages));
                }

                let fetched_page = self.fetch_page::<P>(&url, cookies).await?;
                let number = fetched + 1;
                debug!(page = number, url = %url, "Fetched page");

                let next = match fetched_page.page.next_url() {
                    Some(cursor) => {
                        let next = Self::resolve_cursor(&url, cursor)?;
                        if next.origin() != origin {
                            warn!(cursor = %next, "Refusing cursor to a different origin");
                            return Err(ApiError::CrossOriginCursor(next.to_string()));
                        }
                        Some((next, number))
                    }
                    None => None,
                };
                Ok(Some((fetched_page, next)))
            }
        })
    }

    /// Fetch every page, keeping items grouped by page.
    ///
    /// Fails as a whole on the first bad page; nothing collected so far is
    /// returned.
    pub async fn fetch<P: Page>(
        &self,
        initial: Url,
        cookies: &AuthCookieJar,
    ) -> Result<FetchResult<Vec<Vec<P::Item>>>, ApiError> {
        let mut pages = pin!(self.pages::<P>(initial, cookies));

        let mut items = Vec::new();
        let mut total = 0;
        let mut raw_pages = Vec::new();
        while let Some(FetchedPage { page, raw }) = pages.try_next().await? {
            total = page.total();
            items.push(page.into_items());
            raw_pages.push(raw);
        }

        Ok(FetchResult {
            items,
            total,
            raw_pages,
        })
    }

    async fn fetch_page<P: Page>(
        &self,
        url: &Url,
        cookies: &AuthCookieJar,
    ) -> Result<FetchedPage<P>, ApiError> {
        let cookie_header = cookies.header_value().map_err(|_| {
            ApiError::UpstreamFormat("login cookies cannot be sent back as a header".into())
        })?;

        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .header(header::COOKIE, cookie_header)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, url = %url, "Upstream rejected page request");
            return Err(ApiError::from_status(status, url.as_str(), &body));
        }

        let bytes = response.bytes().await?;
        let raw: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::UpstreamFormat(format!("{}: body is not JSON ({})", url, e)))?;
        let page = P::deserialize(&raw)
            .map_err(|e| ApiError::UpstreamFormat(format!("{}: {}", url, e)))?;

        Ok(FetchedPage { page, raw })
    }

    /// Resolve a cursor, which may be absolute or relative to the current page
    fn resolve_cursor(current: &Url, cursor: &str) -> Result<Url, ApiError> {
        current
            .join(cursor)
            .map_err(|e| ApiError::UpstreamFormat(format!("invalid nextUrl {:?}: {}", cursor, e)))
    }
}
