//! Message model representing one inbound or outbound email record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a message (backend primary key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned thread identifier
///
/// Only present when the backend managed to thread the message itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single message as delivered by the message source
///
/// Everything except the read/archived/starred flags is treated as
/// immutable once received. Missing text fields deserialize to empty
/// strings so malformed records are kept rather than dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub to_email: String,
    /// Subject line exactly as received
    #[serde(default)]
    pub subject: String,
    /// Text or HTML body
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_starred: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
    #[serde(default)]
    pub parent_id: Option<MessageId>,
    #[serde(default)]
    pub campaign_id: Option<i64>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: impl Into<MessageId>) -> MessageBuilder {
        MessageBuilder::new(id.into())
    }

    /// The thread id, if the backend assigned a non-empty one
    pub fn genuine_thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref().filter(|t| !t.is_empty())
    }

    pub fn has_thread_id(&self) -> bool {
        self.genuine_thread_id().is_some()
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    from_email: String,
    to_email: String,
    subject: String,
    body: String,
    is_read: bool,
    is_archived: bool,
    is_starred: bool,
    created_at: Option<DateTime<Utc>>,
    thread_id: Option<ThreadId>,
    parent_id: Option<MessageId>,
    campaign_id: Option<i64>,
    campaign_name: Option<String>,
    tags: Vec<String>,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            from_email: String::new(),
            to_email: String::new(),
            subject: String::new(),
            body: String::new(),
            is_read: false,
            is_archived: false,
            is_starred: false,
            created_at: None,
            thread_id: None,
            parent_id: None,
            campaign_id: None,
            campaign_name: None,
            tags: Vec::new(),
        }
    }

    pub fn from(mut self, from_email: impl Into<String>) -> Self {
        self.from_email = from_email.into();
        self
    }

    pub fn to(mut self, to_email: impl Into<String>) -> Self {
        self.to_email = to_email.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    pub fn archived(mut self, is_archived: bool) -> Self {
        self.is_archived = is_archived;
        self
    }

    pub fn starred(mut self, is_starred: bool) -> Self {
        self.is_starred = is_starred;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn thread_id(mut self, thread_id: impl Into<ThreadId>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn parent_id(mut self, parent_id: impl Into<MessageId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn campaign(mut self, campaign_id: i64, campaign_name: Option<String>) -> Self {
        self.campaign_id = Some(campaign_id);
        self.campaign_name = campaign_name;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            from_email: self.from_email,
            to_email: self.to_email,
            subject: self.subject,
            body: self.body,
            is_read: self.is_read,
            is_archived: self.is_archived,
            is_starred: self.is_starred,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            thread_id: self.thread_id,
            parent_id: self.parent_id,
            campaign_id: self.campaign_id,
            campaign_name: self.campaign_name,
            tags: self.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_record() {
        let json = r#"{
            "id": 42,
            "from_email": "a@x.com",
            "to_email": "b@y.com",
            "subject": "Re: Quote",
            "body": "<p>hi</p>",
            "is_read": true,
            "is_starred": true,
            "created_at": "2024-03-01T10:00:00Z",
            "thread_id": "abc123",
            "parent_id": 41,
            "campaign_id": 7,
            "campaign_name": "Spring",
            "tags": ["Sales"]
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId(42));
        assert_eq!(msg.thread_id, Some(ThreadId::new("abc123")));
        assert_eq!(msg.parent_id, Some(MessageId(41)));
        assert!(msg.is_read);
        assert!(msg.is_starred);
        assert!(!msg.is_archived);
        assert_eq!(msg.tags, vec!["Sales".to_string()]);
    }

    #[test]
    fn test_deserialize_tolerates_missing_fields() {
        let json = r#"{ "id": 1, "created_at": "2024-03-01T10:00:00Z" }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.subject, "");
        assert_eq!(msg.from_email, "");
        assert_eq!(msg.to_email, "");
        assert!(msg.thread_id.is_none());
        assert!(msg.tags.is_empty());
    }

    #[test]
    fn test_empty_thread_id_is_not_genuine() {
        let msg = Message::builder(1).thread_id("").build();
        assert!(!msg.has_thread_id());
        assert!(msg.genuine_thread_id().is_none());

        let msg = Message::builder(2).thread_id("t-1").build();
        assert!(msg.has_thread_id());
    }

    #[test]
    fn test_builder_defaults() {
        let msg = Message::builder(5).from("a@x.com").subject("Hello").build();
        assert_eq!(msg.id.value(), 5);
        assert!(!msg.is_read);
        assert!(!msg.is_archived);
        assert!(!msg.is_starred);
        assert!(msg.campaign_id.is_none());
    }
}
