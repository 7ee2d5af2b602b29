//! In-memory message source
//!
//! Holds messages in a map behind `RwLock`s. Used by tests and the CLI demo
//! mode. Individual operations can be told to fail, which is how the
//! rollback paths in [`crate::actions`] are exercised.

use anyhow::{Result, anyhow, bail};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{MessagePage, MessageSource, Pagination};
use crate::compose::OutgoingMessage;
use crate::filter::MessageFilter;
use crate::models::{Message, MessageId, ThreadId};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOp {
    FetchPage,
    FetchThread,
    MarkRead,
    Delete,
    Send,
}

/// In-memory implementation of [`MessageSource`]
pub struct InMemoryMessageSource {
    messages: RwLock<HashMap<MessageId, Message>>,
    sent: RwLock<Vec<OutgoingMessage>>,
    failing: RwLock<HashSet<SourceOp>>,
}

impl InMemoryMessageSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
            sent: RwLock::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Create a source pre-loaded with messages
    pub fn with_messages<I>(messages: I) -> Self
    where
        I: IntoIterator<Item = Message>,
    {
        let source = Self::new();
        if let Ok(mut map) = source.messages.write() {
            map.extend(messages.into_iter().map(|m| (m.id, m)));
        }
        source
    }

    /// Insert or replace a message
    pub fn upsert(&self, message: Message) -> Result<()> {
        write(&self.messages)?.insert(message.id, message);
        Ok(())
    }

    pub fn get(&self, id: MessageId) -> Result<Option<Message>> {
        Ok(read(&self.messages)?.get(&id).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(read(&self.messages)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Messages handed to `send_message` so far
    pub fn sent(&self) -> Result<Vec<OutgoingMessage>> {
        Ok(read(&self.sent)?.clone())
    }

    /// Make an operation fail (or succeed again) until changed
    pub fn set_failing(&self, op: SourceOp, failing: bool) -> Result<()> {
        let mut set = write(&self.failing)?;
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
        Ok(())
    }

    fn check(&self, op: SourceOp) -> Result<()> {
        if read(&self.failing)?.contains(&op) {
            bail!("Simulated {:?} failure", op);
        }
        Ok(())
    }
}

impl Default for InMemoryMessageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSource for InMemoryMessageSource {
    fn fetch_messages_page(
        &self,
        filter: &MessageFilter,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage> {
        self.check(SourceOp::FetchPage)?;
        let page = page.max(1);

        let messages = read(&self.messages)?;
        let mut matching: Vec<&Message> = messages.values().filter(|m| filter.matches(m)).collect();

        // Newest first, like the backend
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let offset = (page as usize - 1).saturating_mul(limit as usize);
        let page_messages = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(MessagePage {
            messages: page_messages,
            pagination: Pagination::new(page, limit, total),
        })
    }

    fn fetch_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>> {
        self.check(SourceOp::FetchThread)?;
        let messages = read(&self.messages)?;
        Ok(messages
            .values()
            .filter(|m| m.genuine_thread_id() == Some(thread_id))
            .cloned()
            .collect())
    }

    fn mark_read(&self, id: MessageId) -> Result<()> {
        self.check(SourceOp::MarkRead)?;
        let mut messages = write(&self.messages)?;
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Message {} not found", id))?;
        message.is_read = true;
        Ok(())
    }

    fn delete_message(&self, id: MessageId) -> Result<()> {
        self.check(SourceOp::Delete)?;
        write(&self.messages)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Message {} not found", id))
    }

    fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        self.check(SourceOp::Send)?;
        write(&self.sent)?.push(message.clone());
        Ok(())
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("Message source lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("Message source lock poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StatusFilter;
    use chrono::{Duration, TimeZone, Utc};

    fn msg(id: i64, minutes: i64) -> Message {
        Message::builder(id)
            .subject(format!("Subject {id}"))
            .from("a@x.com")
            .to("b@y.com")
            .created_at(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
            )
            .build()
    }

    #[test]
    fn test_paging_newest_first() {
        let source = InMemoryMessageSource::with_messages((1..=5).map(|i| msg(i, i)));

        let page1 = source.fetch_messages_page(&MessageFilter::default(), 1, 2).unwrap();
        let ids: Vec<i64> = page1.messages.iter().map(|m| m.id.value()).collect();
        assert_eq!(ids, vec![5, 4]);
        assert_eq!(page1.pagination.total, 5);
        assert_eq!(page1.pagination.pages, 3);

        let page3 = source.fetch_messages_page(&MessageFilter::default(), 3, 2).unwrap();
        assert_eq!(page3.messages.len(), 1);
        assert_eq!(page3.messages[0].id, MessageId(1));
    }

    #[test]
    fn test_page_filter() {
        let mut read_msg = msg(1, 1);
        read_msg.is_read = true;
        let source = InMemoryMessageSource::with_messages(vec![read_msg, msg(2, 2)]);

        let filter = MessageFilter {
            status: StatusFilter::Unread,
            ..MessageFilter::default()
        };
        let page = source.fetch_messages_page(&filter, 1, 20).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].id, MessageId(2));
    }

    #[test]
    fn test_fetch_thread() {
        let mut a = msg(1, 1);
        a.thread_id = Some("t1".into());
        let mut b = msg(2, 2);
        b.thread_id = Some("t1".into());
        let source = InMemoryMessageSource::with_messages(vec![a, b, msg(3, 3)]);

        let thread = source.fetch_thread(&ThreadId::new("t1")).unwrap();
        assert_eq!(thread.len(), 2);
    }

    #[test]
    fn test_mutations_and_failures() {
        let source = InMemoryMessageSource::with_messages(vec![msg(1, 1), msg(2, 2)]);

        source.mark_read(MessageId(1)).unwrap();
        assert!(source.get(MessageId(1)).unwrap().unwrap().is_read);

        source.set_failing(SourceOp::Delete, true).unwrap();
        assert!(source.delete_message(MessageId(2)).is_err());
        source.set_failing(SourceOp::Delete, false).unwrap();
        source.delete_message(MessageId(2)).unwrap();
        assert_eq!(source.len().unwrap(), 1);

        assert!(source.delete_message(MessageId(99)).is_err());
    }

    #[test]
    fn test_send_records_message() {
        let source = InMemoryMessageSource::new();
        let out = OutgoingMessage::new("a@x.com", "Hi", "Body");
        source.send_message(&out).unwrap();
        assert_eq!(source.sent().unwrap(), vec![out]);
    }
}
