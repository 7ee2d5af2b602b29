//! Owned inbox state: the loaded page window and its conversations
//!
//! An [`Inbox`] is passed explicitly to every operation that reads or
//! changes it. There is no shared or global copy.

use log::{debug, info};
use std::collections::HashMap;

use crate::filter::ConversationFilter;
use crate::grouping::{ConversationMap, KeyOrder};
use crate::models::{Conversation, GroupKey, Message, MessageId};
use crate::source::{MessagePage, Pagination};

/// Handle for one page fetch
///
/// Only the most recently issued ticket can be applied; results of older
/// fetches are dropped whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// The loaded message window plus the conversations built from it
#[derive(Debug, Clone)]
pub struct Inbox {
    pub(crate) messages: Vec<Message>,
    pub(crate) conversations: ConversationMap,
    pagination: Pagination,
    generation: u64,
}

impl Inbox {
    pub fn new(order: KeyOrder) -> Self {
        Self {
            messages: Vec::new(),
            conversations: ConversationMap::new(order),
            pagination: Pagination::default(),
            generation: 0,
        }
    }

    /// Build an inbox directly from a list of messages
    pub fn from_messages(messages: Vec<Message>, order: KeyOrder) -> Self {
        let mut inbox = Self::new(order);
        inbox.replace_window(messages);
        let count = inbox.messages.len();
        inbox.pagination = Pagination::new(1, count as u32, count as u64);
        inbox
    }

    pub fn key_order(&self) -> KeyOrder {
        self.conversations.key_order()
    }

    /// Start a fetch; any earlier ticket becomes stale
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket(self.generation)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Replace the window with a fetched page
    ///
    /// Returns `false` and changes nothing when `ticket` is stale.
    pub fn apply_page(&mut self, ticket: FetchTicket, page: MessagePage) -> bool {
        if !self.is_current(ticket) {
            debug!(
                "Dropping stale page (ticket {}, current {})",
                ticket.0, self.generation
            );
            return false;
        }

        self.pagination = page.pagination;
        self.replace_window(page.messages);
        info!(
            "Loaded page {}/{}: {} messages in {} conversations",
            self.pagination.page,
            self.pagination.pages,
            self.messages.len(),
            self.conversations.len()
        );
        true
    }

    /// Rebuild both layers from `messages`
    ///
    /// A repeated id keeps its first position and takes the last copy's
    /// contents, matching what the conversation map keeps.
    fn replace_window(&mut self, messages: Vec<Message>) {
        let mut positions: HashMap<MessageId, usize> = HashMap::with_capacity(messages.len());
        let mut window: Vec<Message> = Vec::with_capacity(messages.len());
        for message in messages {
            match positions.get(&message.id) {
                Some(&position) => {
                    debug!("Duplicate message {} in page, keeping latest copy", message.id);
                    window[position] = message;
                }
                None => {
                    positions.insert(message.id, window.len());
                    window.push(message);
                }
            }
        }

        self.conversations = ConversationMap::build(window.iter().cloned(), self.key_order());
        self.messages = window;
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// The flat message window, in arrival order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn conversation(&self, key: &GroupKey) -> Option<&Conversation> {
        self.conversations.get(key)
    }

    /// Conversation holding a given message
    pub fn conversation_of(&self, id: MessageId) -> Option<&Conversation> {
        self.conversations
            .key_for(id)
            .and_then(|key| self.conversations.get(key))
    }

    pub fn conversation_map(&self) -> &ConversationMap {
        &self.conversations
    }

    /// All conversations, newest first
    pub fn conversations(&self) -> Vec<&Conversation> {
        self.conversations.sorted()
    }

    /// Conversations matching `filter`, newest first
    pub fn filtered(&self, filter: &ConversationFilter) -> Vec<&Conversation> {
        self.conversations
            .sorted()
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(KeyOrder::default())
    }
}
