use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Another user as embedded in threads and messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single private message.
///
/// Only the fields we look at are typed. Everything else the upstream sends
/// is kept in `extra` so the JSON handed back to callers is unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "createDate", skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<UserRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn sender_name(&self) -> Option<&str> {
        self.from.as_ref().map(|u| u.name.as_str())
    }
}

/// One inbox entry: the conversation with a single peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxThread {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread: Option<Value>,
    #[serde(rename = "lastMessage", skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboxThread {
    /// Username of the peer, lower-cased the way thread lookups expect it
    pub fn peer_username(&self) -> Option<String> {
        self.recipient
            .as_ref()
            .filter(|u| !u.name.is_empty())
            .map(|u| u.name.to_lowercase())
    }
}
