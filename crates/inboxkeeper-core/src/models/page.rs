use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{InboxThread, Message};

/// One page of a cursor-paginated upstream listing.
///
/// `total` and the item array are required; a page missing either is
/// rejected before any of its items are used.
pub trait Page: DeserializeOwned {
    type Item;

    /// Upstream's `total` for this page. Not necessarily the item count.
    fn total(&self) -> i64;

    /// Raw next-page cursor as sent by upstream
    fn next_cursor(&self) -> Option<&str>;

    fn into_items(self) -> Vec<Self::Item>;

    /// Cursor to follow, or `None` when this is the last page
    fn next_url(&self) -> Option<&str> {
        self.next_cursor().map(str::trim).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxPage {
    pub total: i64,
    pub threads: Vec<InboxThread>,
    #[serde(rename = "nextUrl", default)]
    pub next_url: Option<String>,
}

impl Page for InboxPage {
    type Item = InboxThread;

    fn total(&self) -> i64 {
        self.total
    }

    fn next_cursor(&self) -> Option<&str> {
        self.next_url.as_deref()
    }

    fn into_items(self) -> Vec<InboxThread> {
        self.threads
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadPage {
    pub total: i64,
    pub messages: Vec<Message>,
    #[serde(rename = "nextUrl", default)]
    pub next_url: Option<String>,
}

impl Page for ThreadPage {
    type Item = Message;

    fn total(&self) -> i64 {
        self.total
    }

    fn next_cursor(&self) -> Option<&str> {
        self.next_url.as_deref()
    }

    fn into_items(self) -> Vec<Message> {
        self.messages
    }
}
