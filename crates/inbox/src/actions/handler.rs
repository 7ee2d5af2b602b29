//! Action handler for inbox operations
//!
//! Coordinates the message source with the local [`Inbox`].

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;

use crate::compose::OutgoingMessage;
use crate::filter::{ConversationFilter, MessageFilter};
use crate::grouping::{OpenedConversation, open_conversation};
use crate::inbox::Inbox;
use crate::models::{GroupKey, MessageId};
use crate::reconcile::Undo;
use crate::source::MessageSource;

/// Handler for user actions on the inbox
///
/// Persisted actions (read, delete) are optimistic:
/// 1. Update the local inbox immediately
/// 2. Call the message source
/// 3. If that fails, revert the local update and return the error
///
/// Batched reads are saved one id at a time; a failure part way only
/// reverts the ids the source never accepted.
///
/// Star, archive and tag changes have no persistence call in the source
/// contract, so they only live in the local inbox until the next refresh
/// replaces it.
pub struct ActionHandler {
    source: Arc<dyn MessageSource>,
    page_size: u32,
}

impl ActionHandler {
    pub fn new(source: Arc<dyn MessageSource>, page_size: u32) -> Self {
        Self { source, page_size }
    }

    pub fn source(&self) -> &Arc<dyn MessageSource> {
        &self.source
    }

    /// Load one page into the inbox
    ///
    /// On failure the inbox keeps its last successfully loaded state.
    /// Returns whether the page was applied (a newer fetch wins).
    pub fn refresh(
        &self,
        inbox: &mut Inbox,
        filter: &ConversationFilter,
        page: u32,
    ) -> Result<bool> {
        let ticket = inbox.begin_fetch();
        let message_filter = MessageFilter::from(filter);

        match self
            .source
            .fetch_messages_page(&message_filter, page, self.page_size)
        {
            Ok(loaded) => Ok(inbox.apply_page(ticket, loaded)),
            Err(e) => {
                warn!("Failed to load page {}: {:#}", page, e);
                Err(e.context("Failed to load messages"))
            }
        }
    }

    /// Open a conversation for display and mark it read
    ///
    /// Genuine server threads are refetched in full. Other conversations
    /// only contain what the loaded page holds; check
    /// [`OpenedConversation::completeness`].
    pub fn open(&self, inbox: &mut Inbox, key: &GroupKey) -> Result<OpenedConversation> {
        let conversation = inbox
            .conversation(key)
            .with_context(|| format!("Conversation {} is not loaded", key))?;
        let mut opened = open_conversation(conversation, self.source.as_ref())?;

        if opened.conversation.has_unread() {
            self.mark_opened_read(inbox, &mut opened);
        }
        Ok(opened)
    }

    /// Mark every unread message of an opened view read
    ///
    /// Opening must still succeed if persisting fails, so failures are
    /// logged and the unsaved reads rolled back instead of returned.
    fn mark_opened_read(&self, inbox: &mut Inbox, opened: &mut OpenedConversation) {
        let key = opened.conversation.key().clone();
        let unread: Vec<MessageId> = opened
            .conversation
            .messages()
            .iter()
            .filter(|m| !m.is_read)
            .map(|m| m.id)
            .collect();

        let undo = inbox.mark_conversation_read(&key).ok();
        let saved = match self.persist_read(&unread) {
            Ok(()) => unread,
            Err(failure) => {
                warn!("Failed to mark conversation {} read: {:#}", key, failure.error);
                if let Some(undo) = undo {
                    self.rollback(inbox, without_saved(undo, &failure.saved));
                }
                failure.saved
            }
        };

        let view = &mut opened.conversation;
        for member in view.messages.iter_mut() {
            if saved.contains(&member.id) {
                member.is_read = true;
            }
        }
        view.unread_count = view.messages.iter().filter(|m| !m.is_read).count();
    }

    /// Mark a single message read
    pub fn mark_read(&self, inbox: &mut Inbox, id: MessageId) -> Result<()> {
        let undo = inbox.mark_read(id)?;
        if let Undo::MarkRead { was_read: true, .. } = undo {
            return Ok(());
        }

        if let Err(e) = self.source.mark_read(id) {
            self.rollback(inbox, undo);
            return Err(e.context(format!("Failed to mark message {} read", id)));
        }
        Ok(())
    }

    /// Mark every message of a conversation read
    pub fn mark_conversation_read(&self, inbox: &mut Inbox, key: &GroupKey) -> Result<()> {
        let undo = inbox.mark_conversation_read(key)?;
        let Undo::ConversationRead { ids, .. } = &undo else {
            return Ok(());
        };

        if let Err(failure) = self.persist_read(ids) {
            self.rollback(inbox, without_saved(undo, &failure.saved));
            return Err(failure
                .error
                .context(format!("Failed to mark conversation {} read", key)));
        }
        info!("Marked conversation {} read", key);
        Ok(())
    }

    /// Delete a message
    pub fn delete_message(&self, inbox: &mut Inbox, id: MessageId) -> Result<()> {
        let undo = inbox.delete_message(id)?;

        if let Err(e) = self.source.delete_message(id) {
            self.rollback(inbox, undo);
            return Err(e.context(format!("Failed to delete message {}", id)));
        }
        info!("Deleted message {}", id);
        Ok(())
    }

    /// Toggle a message's star (local only)
    pub fn toggle_star(&self, inbox: &mut Inbox, id: MessageId) -> Result<()> {
        let _ = inbox.toggle_star(id)?;
        Ok(())
    }

    /// Toggle a message's archived flag (local only)
    pub fn toggle_archive(&self, inbox: &mut Inbox, id: MessageId) -> Result<()> {
        let _ = inbox.toggle_archive(id)?;
        Ok(())
    }

    /// Add a tag to a conversation (local only)
    pub fn add_tag(&self, inbox: &mut Inbox, key: &GroupKey, tag: &str) -> Result<()> {
        let _ = inbox.add_tag(key, tag)?;
        Ok(())
    }

    /// Remove a tag from a conversation (local only)
    pub fn remove_tag(&self, inbox: &mut Inbox, key: &GroupKey, tag: &str) -> Result<()> {
        let _ = inbox.remove_tag(key, tag)?;
        Ok(())
    }

    /// Validate and send a message
    ///
    /// The inbox is not changed; refresh to see the sent message.
    pub fn send(&self, message: &OutgoingMessage) -> Result<()> {
        message.validate()?;
        self.source.send_message(message)?;
        info!("Sent message to {}", message.to_email);
        Ok(())
    }

    /// Persist read flags in order, stopping at the first failure
    fn persist_read(&self, ids: &[MessageId]) -> Result<(), PartialFailure> {
        for (done, id) in ids.iter().enumerate() {
            if let Err(error) = self.source.mark_read(*id) {
                return Err(PartialFailure {
                    saved: ids[..done].to_vec(),
                    error,
                });
            }
        }
        Ok(())
    }

    fn rollback(&self, inbox: &mut Inbox, undo: Undo) {
        if let Err(e) = inbox.revert(undo) {
            warn!("Failed to roll back local change: {}", e);
        }
    }
}

/// A batch of source calls that stopped part way
struct PartialFailure {
    /// Ids the source accepted before the failure
    saved: Vec<MessageId>,
    error: anyhow::Error,
}

/// Keep only the ids the source never accepted in a conversation-read undo
///
/// Those already saved stay read locally so the inbox matches the source.
fn without_saved(undo: Undo, saved: &[MessageId]) -> Undo {
    match undo {
        Undo::ConversationRead { key, ids } => Undo::ConversationRead {
            key,
            ids: ids.into_iter().filter(|id| !saved.contains(id)).collect(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{Completeness, KeyOrder};
    use crate::models::Message;
    use crate::source::{InMemoryMessageSource, SourceOp};
    use chrono::{Duration, TimeZone, Utc};

    fn msg(id: i64, minutes: i64) -> Message {
        Message::builder(id)
            .subject("Quote")
            .from("a@x.com")
            .to("b@y.com")
            .created_at(
                Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
            )
            .build()
    }

    fn setup(messages: Vec<Message>) -> (ActionHandler, Arc<InMemoryMessageSource>, Inbox) {
        let source = Arc::new(InMemoryMessageSource::with_messages(messages));
        let handler = ActionHandler::new(source.clone(), 20);
        let mut inbox = Inbox::new(KeyOrder::Canonical);
        handler
            .refresh(&mut inbox, &ConversationFilter::default(), 1)
            .unwrap();
        (handler, source, inbox)
    }

    #[test]
    fn test_refresh_loads_conversations() {
        let (_, _, inbox) = setup(vec![msg(1, 0), msg(2, 5)]);
        assert_eq!(inbox.messages().len(), 2);
        assert_eq!(inbox.conversations().len(), 1);
    }

    #[test]
    fn test_refresh_failure_keeps_previous_state() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0)]);
        source.set_failing(SourceOp::FetchPage, true).unwrap();

        assert!(
            handler
                .refresh(&mut inbox, &ConversationFilter::default(), 1)
                .is_err()
        );
        assert_eq!(inbox.messages().len(), 1);
        assert_eq!(inbox.conversations().len(), 1);
    }

    #[test]
    fn test_mark_read_persists() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0)]);
        handler.mark_read(&mut inbox, MessageId(1)).unwrap();

        assert!(inbox.message(MessageId(1)).unwrap().is_read);
        assert!(source.get(MessageId(1)).unwrap().unwrap().is_read);
    }

    #[test]
    fn test_mark_read_rolls_back_on_failure() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0)]);
        source.set_failing(SourceOp::MarkRead, true).unwrap();

        assert!(handler.mark_read(&mut inbox, MessageId(1)).is_err());
        assert!(!inbox.message(MessageId(1)).unwrap().is_read);
        assert_eq!(inbox.conversations()[0].unread_count(), 1);
    }

    #[test]
    fn test_delete_rolls_back_on_failure() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0)]);
        source.set_failing(SourceOp::Delete, true).unwrap();

        assert!(handler.delete_message(&mut inbox, MessageId(1)).is_err());
        assert_eq!(inbox.messages().len(), 1);
        assert_eq!(inbox.conversations().len(), 1);

        source.set_failing(SourceOp::Delete, false).unwrap();
        handler.delete_message(&mut inbox, MessageId(1)).unwrap();
        assert!(inbox.conversations().is_empty());
        assert!(source.is_empty().unwrap());
    }

    #[test]
    fn test_open_marks_read() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0), msg(2, 5)]);
        let key = inbox.conversations()[0].key().clone();

        let opened = handler.open(&mut inbox, &key).unwrap();
        assert_eq!(opened.completeness, Completeness::Windowed);
        assert_eq!(opened.conversation.unread_count(), 0);
        assert_eq!(inbox.conversation(&key).unwrap().unread_count(), 0);
        assert!(source.get(MessageId(2)).unwrap().unwrap().is_read);
    }

    #[test]
    fn test_open_survives_mark_read_failure() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0)]);
        let key = inbox.conversations()[0].key().clone();
        source.set_failing(SourceOp::MarkRead, true).unwrap();

        let opened = handler.open(&mut inbox, &key).unwrap();
        assert_eq!(opened.conversation.unread_count(), 1);
        assert_eq!(inbox.conversation(&key).unwrap().unread_count(), 1);
    }

    #[test]
    fn test_send_validates_first() {
        let (handler, source, _) = setup(vec![]);
        let draft = OutgoingMessage::new("a@x.com", "Hi", "");
        assert!(handler.send(&draft).is_err());
        assert!(source.sent().unwrap().is_empty());

        let draft = draft.with_body("Hello").from_account("1");
        handler.send(&draft).unwrap();
        assert_eq!(source.sent().unwrap().len(), 1);
    }

    #[test]
    fn test_conversation_read_keeps_saved_ids_on_partial_failure() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0), msg(2, 5), msg(3, 10)]);
        let key = inbox.conversations()[0].key().clone();
        // The source no longer knows message 2, so persisting it fails
        source.delete_message(MessageId(2)).unwrap();

        assert!(handler.mark_conversation_read(&mut inbox, &key).is_err());

        for id in [1, 3] {
            let id = MessageId(id);
            let remote = source.get(id).unwrap().unwrap().is_read;
            assert_eq!(inbox.message(id).unwrap().is_read, remote);
        }
        assert!(!inbox.message(MessageId(2)).unwrap().is_read);

        let conversation = inbox.conversation(&key).unwrap();
        let unread = conversation.messages().iter().filter(|m| !m.is_read).count();
        assert_eq!(conversation.unread_count(), unread);
        assert!(conversation.has_unread());
    }

    #[test]
    fn test_open_reflects_partially_saved_reads() {
        let (handler, source, mut inbox) = setup(vec![msg(1, 0), msg(2, 5), msg(3, 10)]);
        let key = inbox.conversations()[0].key().clone();
        source.delete_message(MessageId(2)).unwrap();

        let opened = handler.open(&mut inbox, &key).unwrap();

        let local = inbox.conversation(&key).unwrap();
        for member in opened.conversation.messages() {
            assert_eq!(member.is_read, local.message(member.id).unwrap().is_read);
        }
        assert_eq!(opened.conversation.unread_count(), local.unread_count());
        assert!(!inbox.message(MessageId(2)).unwrap().is_read);
    }
}
