//! Conversation aggregation
//!
//! Folds a flat list of messages into one [`Conversation`] per group key.
//! Every merge rule is commutative and associative (set unions, counts,
//! OR-reductions, max timestamp), so arrival order only affects the order
//! of the member list.

use log::debug;
use std::collections::{BTreeSet, HashMap};

use super::identity::classify;
use super::key::{KeyOrder, normalize_subject, resolve_with};
use crate::models::{Conversation, GroupKey, Message, MessageId};

/// All conversations built from the loaded messages, keyed by group key
#[derive(Debug, Clone, Default)]
pub struct ConversationMap {
    conversations: HashMap<GroupKey, Conversation>,
    /// Which conversation each message currently belongs to
    index: HashMap<MessageId, GroupKey>,
    order: KeyOrder,
    next_arrival: u64,
}

impl ConversationMap {
    /// Create an empty map that resolves fallback keys with `order`
    pub fn new(order: KeyOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// Build conversations from messages in arrival order
    pub fn build<I>(messages: I, order: KeyOrder) -> Self
    where
        I: IntoIterator<Item = Message>,
    {
        let mut map = Self::new(order);
        for message in messages {
            map.insert(message);
        }
        debug!(
            "Built {} conversations from {} messages",
            map.conversations.len(),
            map.index.len()
        );
        map
    }

    pub fn key_order(&self) -> KeyOrder {
        self.order
    }

    /// Add a message, creating or merging into its conversation
    ///
    /// A message whose id is already present replaces the old copy.
    pub fn insert(&mut self, message: Message) -> GroupKey {
        if self.index.contains_key(&message.id) {
            self.remove_message(message.id);
        }

        let key = resolve_with(&message, self.order);
        self.index.insert(message.id, key.clone());

        match self.conversations.get_mut(&key) {
            Some(conversation) => merge(conversation, message),
            None => {
                let arrival = self.next_arrival;
                self.next_arrival += 1;
                let conversation = seed(key.clone(), message, arrival);
                self.conversations.insert(key.clone(), conversation);
            }
        }
        key
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Conversation> {
        self.conversations.get(key)
    }

    /// Key of the conversation holding a message
    pub fn key_for(&self, id: MessageId) -> Option<&GroupKey> {
        self.index.get(&id)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    /// Conversations newest first by last message
    ///
    /// Ties keep the order in which the keys were first seen.
    pub fn sorted(&self) -> Vec<&Conversation> {
        let mut list: Vec<&Conversation> = self.conversations.values().collect();
        list.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then(a.arrival.cmp(&b.arrival))
        });
        list
    }

    pub(crate) fn get_mut(&mut self, key: &GroupKey) -> Option<&mut Conversation> {
        self.conversations.get_mut(key)
    }

    /// Remove a message from its conversation
    ///
    /// Derived fields are recomputed from the remaining members; the
    /// conversation itself is dropped once it has no messages left.
    /// Returns the key and the removed message.
    pub(crate) fn remove_message(&mut self, id: MessageId) -> Option<(GroupKey, Message)> {
        let key = self.index.remove(&id)?;
        let conversation = self.conversations.get_mut(&key)?;
        let position = conversation.messages.iter().position(|m| m.id == id)?;
        let message = conversation.messages.remove(position);

        if conversation.messages.is_empty() {
            self.conversations.remove(&key);
            debug!("Conversation {} removed (no messages left)", key);
        } else {
            recompute(conversation);
        }
        Some((key, message))
    }

    /// Put a previously captured conversation back in place
    pub(crate) fn restore(&mut self, conversation: Conversation) {
        for message in &conversation.messages {
            self.index.insert(message.id, conversation.key.clone());
        }
        self.conversations
            .insert(conversation.key.clone(), conversation);
    }
}

/// Fold messages into a single conversation under a fixed key
///
/// Used for full-thread results, where every message belongs to the same
/// conversation regardless of what its own fields would resolve to.
pub fn fold_conversation<I>(key: GroupKey, messages: I) -> Option<Conversation>
where
    I: IntoIterator<Item = Message>,
{
    let mut messages = messages.into_iter();
    let mut conversation = seed(key, messages.next()?, 0);
    for message in messages {
        merge(&mut conversation, message);
    }
    Some(conversation)
}

fn seed(key: GroupKey, message: Message, arrival: u64) -> Conversation {
    let participants = BTreeSet::from([message.from_email.clone(), message.to_email.clone()]);
    let identity = classify(&key, std::slice::from_ref(&message));

    Conversation {
        subject: normalize_subject(&message.subject),
        participants,
        unread_count: usize::from(!message.is_read),
        last_message_id: message.id,
        last_message_at: message.created_at,
        tags: message.tags.iter().cloned().collect(),
        is_archived: message.is_archived,
        is_starred: message.is_starred,
        identity,
        arrival,
        key,
        messages: vec![message],
    }
}

fn merge(conversation: &mut Conversation, message: Message) {
    if !message.is_read {
        conversation.unread_count += 1;
    }
    conversation.participants.insert(message.from_email.clone());
    conversation.participants.insert(message.to_email.clone());
    conversation.tags.extend(message.tags.iter().cloned());
    conversation.is_archived |= message.is_archived;
    conversation.is_starred |= message.is_starred;

    if is_newer(&message, conversation.last_message_at, conversation.last_message_id) {
        conversation.last_message_id = message.id;
        conversation.last_message_at = message.created_at;
    }
    conversation.messages.push(message);
}

/// Equal timestamps break toward the larger id so the winner does not
/// depend on arrival order.
fn is_newer(
    message: &Message,
    last_at: chrono::DateTime<chrono::Utc>,
    last_id: MessageId,
) -> bool {
    (message.created_at, message.id) > (last_at, last_id)
}

/// Rebuild every field derived from the member list
///
/// Tags are left alone: they can be edited at the conversation level and
/// are not owned by any single message.
pub(crate) fn recompute(conversation: &mut Conversation) {
    let mut participants = BTreeSet::new();
    let mut unread = 0;
    let mut archived = false;
    let mut starred = false;
    let mut last: Option<&Message> = None;

    for message in &conversation.messages {
        participants.insert(message.from_email.clone());
        participants.insert(message.to_email.clone());
        unread += usize::from(!message.is_read);
        archived |= message.is_archived;
        starred |= message.is_starred;
        if last.is_none_or(|l| is_newer(message, l.created_at, l.id)) {
            last = Some(message);
        }
    }

    if let Some(last) = last {
        conversation.last_message_id = last.id;
        conversation.last_message_at = last.created_at;
    }
    conversation.participants = participants;
    conversation.unread_count = unread;
    conversation.is_archived = archived;
    conversation.is_starred = starred;
    conversation.identity = classify(&conversation.key, &conversation.messages);
}
