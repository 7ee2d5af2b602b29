//! Conversation model: the aggregate of all messages sharing a group key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{Message, MessageId, ThreadId};

/// Key identifying which conversation a message belongs to
///
/// Either a server thread id verbatim, or a locally synthesized
/// `subject-address-address` string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey(pub String);

impl GroupKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a conversation key can be trusted for a full-thread refetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadIdentity {
    /// Key is a server-assigned thread id
    Genuine(ThreadId),
    /// Key was synthesized locally; only the loaded window is known
    Fallback,
}

impl ThreadIdentity {
    pub fn is_genuine(&self) -> bool {
        matches!(self, ThreadIdentity::Genuine(_))
    }
}

/// A conversation built from the currently loaded messages
///
/// Counts and flags are derived from `messages` and kept in step by the
/// aggregator and the reconciler. There is no public way to edit them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub(crate) key: GroupKey,
    pub(crate) subject: String,
    pub(crate) participants: BTreeSet<String>,
    pub(crate) messages: Vec<Message>,
    pub(crate) unread_count: usize,
    pub(crate) last_message_id: MessageId,
    pub(crate) last_message_at: DateTime<Utc>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) is_archived: bool,
    pub(crate) is_starred: bool,
    pub(crate) identity: ThreadIdentity,
    /// Position in which the key was first seen, for stable sorting
    pub(crate) arrival: u64,
}

impl Conversation {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Subject with reply/forward markers removed
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn participants(&self) -> &BTreeSet<String> {
        &self.participants
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn is_archived(&self) -> bool {
        self.is_archived
    }

    pub fn is_starred(&self) -> bool {
        self.is_starred
    }

    pub fn identity(&self) -> &ThreadIdentity {
        &self.identity
    }

    pub fn last_message_at(&self) -> DateTime<Utc> {
        self.last_message_at
    }

    /// The most recent member message
    pub fn last_message(&self) -> Option<&Message> {
        self.message(self.last_message_id)
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}
