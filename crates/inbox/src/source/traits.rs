//! Message source trait and page types

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::compose::OutgoingMessage;
use crate::filter::MessageFilter;
use crate::models::{Message, MessageId, ThreadId};

/// Default number of messages per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page metadata returned alongside a page of messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    /// Total messages matching the filter
    pub total: u64,
    /// Total number of pages
    pub pages: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit)) as u32
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE, 0)
    }
}

/// One page of messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

/// Backend that owns the raw messages
///
/// Every call is independent and may fail on its own. Implementations are
/// shared behind an `Arc`, so they must be `Send + Sync`.
pub trait MessageSource: Send + Sync {
    /// Fetch one page of messages matching `filter`
    fn fetch_messages_page(&self, filter: &MessageFilter, page: u32, limit: u32)
    -> Result<MessagePage>;

    /// Fetch every message of a server thread, in no particular order
    fn fetch_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>>;

    /// Persist the read flag of a message
    fn mark_read(&self, id: MessageId) -> Result<()>;

    /// Delete a message
    fn delete_message(&self, id: MessageId) -> Result<()>;

    /// Hand a message to the send transport
    fn send_message(&self, message: &OutgoingMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_pages() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).pages, 2);
        assert_eq!(Pagination::new(1, 0, 5).pages, 0);
    }

    #[test]
    fn test_has_next() {
        assert!(Pagination::new(1, 10, 25).has_next());
        assert!(!Pagination::new(3, 10, 25).has_next());
    }
}
