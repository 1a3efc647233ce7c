//! Inbox and message-thread clients.
//!
//! Both are thin wrappers over `PaginatedFetcher` bound to one endpoint each.
//! They differ in how pages are combined: the inbox is flattened into one
//! list of threads, a message thread keeps its page grouping.

use anyhow::Result;
use reqwest::Url;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::info;

use super::pagination::{FetchResult, PaginatedFetcher};
use super::ApiError;
use crate::auth::AuthCookieJar;
use crate::config::UpstreamConfig;
use crate::models::{InboxPage, InboxThread, Message, ThreadPage};

const INBOX_QUERY: &str = "filter=&limit=20&offset=0";
const THREAD_QUERY: &str = "offset=0";

/// Inbox threads, flattened across pages
pub type InboxResult = FetchResult<Vec<InboxThread>>;

/// Messages of one conversation, one inner `Vec` per upstream page
pub type ThreadResult = FetchResult<Vec<Vec<Message>>>;

/// Parsed upstream base URL that endpoint paths are appended to
#[derive(Debug, Clone)]
struct ApiBase(Url);

impl ApiBase {
    fn new(config: &UpstreamConfig) -> Result<Self> {
        let base = config.base()?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Base URL {} cannot carry a path", base);
        }
        Ok(Self(base))
    }

    /// `segments` are percent-encoded individually, so usernames cannot
    /// escape their path segment.
    fn endpoint(&self, segments: &[&str], query: &str) -> Url {
        let mut url = self.0.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.set_query(Some(query));
        url
    }
}

#[derive(Clone)]
pub struct InboxClient {
    fetcher: PaginatedFetcher,
    base: ApiBase,
}

impl InboxClient {
    pub fn new(fetcher: PaginatedFetcher, config: &UpstreamConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            base: ApiBase::new(config)?,
        })
    }

    pub fn inbox_url(&self, username: &str) -> Url {
        self.base
            .endpoint(&["api", "v3", "users", username, "inbox"], INBOX_QUERY)
    }

    /// Fetch every inbox thread of `username`
    pub async fn fetch_inbox(
        &self,
        username: &str,
        cookies: &AuthCookieJar,
    ) -> Result<InboxResult, ApiError> {
        let result = self
            .fetcher
            .fetch::<InboxPage>(self.inbox_url(username), cookies)
            .await?
            .map_items(|pages| pages.into_iter().flatten().collect::<Vec<_>>());
        info!(
            username = %username,
            threads = result.items.len(),
            pages = result.raw_pages.len(),
            "Inbox fetched"
        );
        Ok(result)
    }
}

#[derive(Clone)]
pub struct MessageThreadClient {
    fetcher: PaginatedFetcher,
    base: ApiBase,
}

impl MessageThreadClient {
    pub fn new(fetcher: PaginatedFetcher, config: &UpstreamConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            base: ApiBase::new(config)?,
        })
    }

    pub fn thread_url(&self, username: &str, peer: &str) -> Url {
        self.base
            .endpoint(&["api", "v3", "users", username, "inbox", peer], THREAD_QUERY)
    }

    /// Fetch the whole conversation between `username` and `peer`
    pub async fn fetch_thread(
        &self,
        username: &str,
        peer: &str,
        cookies: &AuthCookieJar,
    ) -> Result<ThreadResult, ApiError> {
        let result = self
            .fetcher
            .fetch::<ThreadPage>(self.thread_url(username, peer), cookies)
            .await?;
        info!(
            username = %username,
            peer = %peer,
            pages = result.raw_pages.len(),
            total = result.total,
            "Thread fetched"
        );
        Ok(result)
    }

    /// Fetch several conversations one after another, in the given order.
    ///
    /// Peer names are lower-cased and used as keys. Repeated peers are
    /// fetched once. The first failure aborts the remaining peers.
    pub async fn fetch_threads<S: AsRef<str>>(
        &self,
        username: &str,
        peers: &[S],
        cookies: &AuthCookieJar,
    ) -> Result<PeerThreads, ApiError> {
        let mut threads = PeerThreads::default();
        for peer in peers {
            let peer = peer.as_ref().to_lowercase();
            if threads.get(&peer).is_some() {
                continue;
            }
            let result = self.fetch_thread(username, &peer, cookies).await?;
            threads.push(peer, result);
        }
        Ok(threads)
    }
}

/// Split a comma-separated peer list into lower-cased usernames.
/// Blank entries and repeats are dropped; order is kept.
pub fn parse_peer_list(csv: &str) -> Vec<String> {
    let mut peers: Vec<String> = Vec::new();
    for name in csv.to_lowercase().split(',') {
        let name = name.trim();
        if !name.is_empty() && !peers.iter().any(|p| p == name) {
            peers.push(name.to_string());
        }
    }
    peers
}

/// Per-peer thread results, in the order they were fetched.
/// Serializes as a JSON object keyed by peer username.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerThreads {
    entries: Vec<(String, ThreadResult)>,
}

impl PeerThreads {
    fn push(&mut self, peer: String, result: ThreadResult) {
        self.entries.push((peer, result));
    }

    pub fn get(&self, peer: &str) -> Option<&ThreadResult> {
        self.entries
            .iter()
            .find(|(name, _)| name == peer)
            .map(|(_, result)| result)
    }

    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ThreadResult)> {
        self.entries.iter().map(|(name, result)| (name.as_str(), result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PeerThreads {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (peer, result) in &self.entries {
            map.serialize_entry(peer, result)?;
        }
        map.end()
    }
}
