//! Conversation list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::ConversationFilter;
use crate::inbox::Inbox;
use crate::models::{Conversation, GroupKey};

/// Maximum characters of the last message body shown as a snippet
const SNIPPET_CHARS: usize = 120;

/// Summary information for displaying a conversation in a list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub key: GroupKey,
    /// Normalized subject
    pub subject: String,
    /// Participants in sorted order
    pub participants: Vec<String>,
    /// Start of the last message's body
    pub snippet: String,
    pub last_message_at: DateTime<Utc>,
    /// Sender of the last message
    pub last_sender: String,
    pub message_count: usize,
    pub unread_count: usize,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub is_starred: bool,
    /// Whether opening will refetch the full server thread
    pub is_threaded: bool,
    pub campaign_name: Option<String>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        let last = conversation.last_message();
        Self {
            key: conversation.key().clone(),
            subject: conversation.subject().to_string(),
            participants: conversation.participants().iter().cloned().collect(),
            snippet: last.map(|m| snippet(&m.body)).unwrap_or_default(),
            last_message_at: conversation.last_message_at(),
            last_sender: last.map(|m| m.from_email.clone()).unwrap_or_default(),
            message_count: conversation.message_count(),
            unread_count: conversation.unread_count(),
            tags: conversation.tags().iter().cloned().collect(),
            is_archived: conversation.is_archived(),
            is_starred: conversation.is_starred(),
            is_threaded: conversation.identity().is_genuine(),
            campaign_name: last.and_then(|m| m.campaign_name.clone()),
        }
    }
}

/// List conversations matching `filter` with pagination
///
/// Sorted by last message descending (newest first).
///
/// # Arguments
/// * `inbox` - The loaded inbox
/// * `filter` - Status, campaign and search filter
/// * `limit` - Maximum number of conversations to return
/// * `offset` - Number of conversations to skip
pub fn list_conversations(
    inbox: &Inbox,
    filter: &ConversationFilter,
    limit: usize,
    offset: usize,
) -> Vec<ConversationSummary> {
    inbox
        .filtered(filter)
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(ConversationSummary::from)
        .collect()
}

/// Collapse whitespace and cut to [`SNIPPET_CHARS`] characters
fn snippet(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_CHARS {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(SNIPPET_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::KeyOrder;
    use crate::models::Message;

    fn setup_inbox() -> Inbox {
        let messages = (0..5)
            .map(|i| {
                Message::builder(i)
                    .subject(format!("Thread {}", i))
                    .from(format!("sender{}@example.com", i))
                    .to("me@example.com")
                    .body(format!("Body   of\nmessage {}", i))
                    .created_at(Utc::now() - chrono::Duration::hours(i))
                    .read(i % 2 == 0)
                    .build()
            })
            .collect();
        Inbox::from_messages(messages, KeyOrder::Canonical)
    }

    #[test]
    fn test_list_conversations() {
        let inbox = setup_inbox();

        let list = list_conversations(&inbox, &ConversationFilter::default(), 3, 0);
        assert_eq!(list.len(), 3);
        // Newest first
        assert_eq!(list[0].subject, "Thread 0");
        assert_eq!(list[1].subject, "Thread 1");
        assert_eq!(list[2].subject, "Thread 2");
        assert_eq!(list[0].snippet, "Body of message 0");
        assert_eq!(list[0].last_sender, "sender0@example.com");
        assert!(!list[0].is_threaded);
    }

    #[test]
    fn test_list_pagination() {
        let inbox = setup_inbox();
        let page1 = list_conversations(&inbox, &ConversationFilter::default(), 2, 0);
        let page2 = list_conversations(&inbox, &ConversationFilter::default(), 2, 2);

        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 2);
        assert_ne!(page1[0].key, page2[0].key);
    }

    #[test]
    fn test_list_with_status_filter() {
        let inbox = setup_inbox();
        let filter = ConversationFilter::default().with_status(crate::filter::StatusFilter::Unread);
        let list = list_conversations(&inbox, &filter, 10, 0);
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|c| c.unread_count > 0));
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "word ".repeat(100);
        let s = snippet(&long);
        assert!(s.ends_with('…'));
        assert!(s.chars().count() <= SNIPPET_CHARS + 1);
    }
}
