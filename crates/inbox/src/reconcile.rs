//! Local mutations applied to both the message window and its conversations
//!
//! Each entry point updates the flat message list and the affected
//! conversation before returning, so callers never see the two disagree.
//! Lookups happen before anything is changed: an error leaves both layers
//! untouched.
//!
//! Every successful mutation returns an [`Undo`]. Feeding it to
//! [`Inbox::revert`] restores the previous state, which is how a failed
//! persistence call is rolled back.

use log::debug;

use crate::inbox::Inbox;
use crate::models::{Conversation, GroupKey, Message, MessageId};

/// A mutation referred to something that is not loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Message {0} is not in the loaded window")]
    UnknownMessage(MessageId),
    #[error("Conversation {0} is not loaded")]
    UnknownConversation(GroupKey),
}

/// Inverse of a mutation
///
/// Must be reverted before any other mutation touches the same
/// conversation.
#[derive(Debug, Clone)]
#[must_use]
pub enum Undo {
    MarkRead {
        id: MessageId,
        was_read: bool,
    },
    ConversationRead {
        key: GroupKey,
        /// Members that were unread before
        ids: Vec<MessageId>,
    },
    Star {
        id: MessageId,
    },
    Archive {
        id: MessageId,
    },
    AddTag {
        key: GroupKey,
        tag: String,
        added: bool,
    },
    RemoveTag {
        key: GroupKey,
        tag: String,
        removed: bool,
    },
    Delete {
        position: usize,
        message: Message,
        conversation: Box<Conversation>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Starred,
    Archived,
}

impl Flag {
    fn get(self, message: &Message) -> bool {
        match self {
            Flag::Starred => message.is_starred,
            Flag::Archived => message.is_archived,
        }
    }

    fn flip(self, message: &mut Message) {
        match self {
            Flag::Starred => message.is_starred = !message.is_starred,
            Flag::Archived => message.is_archived = !message.is_archived,
        }
    }
}

impl Inbox {
    /// Mark one message read
    pub fn mark_read(&mut self, id: MessageId) -> Result<Undo, ReconcileError> {
        let was_read = self.set_read(id, true)?;
        Ok(Undo::MarkRead { id, was_read })
    }

    /// Mark one message unread
    pub fn mark_unread(&mut self, id: MessageId) -> Result<Undo, ReconcileError> {
        let was_read = self.set_read(id, false)?;
        Ok(Undo::MarkRead { id, was_read })
    }

    /// Mark every member of a conversation read
    pub fn mark_conversation_read(&mut self, key: &GroupKey) -> Result<Undo, ReconcileError> {
        let conversation = self
            .conversations
            .get_mut(key)
            .ok_or_else(|| ReconcileError::UnknownConversation(key.clone()))?;

        let mut ids = Vec::new();
        for member in conversation.messages.iter_mut().filter(|m| !m.is_read) {
            member.is_read = true;
            ids.push(member.id);
        }
        conversation.unread_count = 0;

        for message in self.messages.iter_mut().filter(|m| ids.contains(&m.id)) {
            message.is_read = true;
        }

        debug!("Marked {} messages read in {}", ids.len(), key);
        Ok(Undo::ConversationRead {
            key: key.clone(),
            ids,
        })
    }

    /// Flip a message's star
    ///
    /// The conversation stays starred while any other member is starred,
    /// so unstarring one message may not change the conversation flag.
    pub fn toggle_star(&mut self, id: MessageId) -> Result<Undo, ReconcileError> {
        self.toggle_flag(id, Flag::Starred)?;
        Ok(Undo::Star { id })
    }

    /// Flip a message's archived flag; the conversation flag is the OR of
    /// its members, as with stars
    pub fn toggle_archive(&mut self, id: MessageId) -> Result<Undo, ReconcileError> {
        self.toggle_flag(id, Flag::Archived)?;
        Ok(Undo::Archive { id })
    }

    /// Add a tag to a conversation (tags are conversation-scoped)
    pub fn add_tag(&mut self, key: &GroupKey, tag: &str) -> Result<Undo, ReconcileError> {
        let conversation = self.conversation_mut(key)?;
        let added = conversation.tags.insert(tag.to_string());
        Ok(Undo::AddTag {
            key: key.clone(),
            tag: tag.to_string(),
            added,
        })
    }

    pub fn remove_tag(&mut self, key: &GroupKey, tag: &str) -> Result<Undo, ReconcileError> {
        let conversation = self.conversation_mut(key)?;
        let removed = conversation.tags.remove(tag);
        Ok(Undo::RemoveTag {
            key: key.clone(),
            tag: tag.to_string(),
            removed,
        })
    }

    /// Remove a message from the window and its conversation
    ///
    /// The conversation disappears with its last message.
    pub fn delete_message(&mut self, id: MessageId) -> Result<Undo, ReconcileError> {
        let (position, key) = self.locate(id)?;
        let snapshot = self
            .conversations
            .get(&key)
            .cloned()
            .ok_or_else(|| ReconcileError::UnknownConversation(key.clone()))?;

        let message = self.messages.remove(position);
        self.conversations.remove_message(id);

        debug!("Deleted message {} from {}", id, key);
        Ok(Undo::Delete {
            position,
            message,
            conversation: Box::new(snapshot),
        })
    }

    /// Undo a previous mutation
    pub fn revert(&mut self, undo: Undo) -> Result<(), ReconcileError> {
        match undo {
            Undo::MarkRead { id, was_read } => {
                self.set_read(id, was_read)?;
            }
            Undo::ConversationRead { ids, .. } => {
                for id in ids {
                    self.set_read(id, false)?;
                }
            }
            Undo::Star { id } => self.toggle_flag(id, Flag::Starred)?,
            Undo::Archive { id } => self.toggle_flag(id, Flag::Archived)?,
            Undo::AddTag { key, tag, added } => {
                if added {
                    self.conversation_mut(&key)?.tags.remove(&tag);
                }
            }
            Undo::RemoveTag { key, tag, removed } => {
                if removed {
                    self.conversation_mut(&key)?.tags.insert(tag);
                }
            }
            Undo::Delete {
                position,
                message,
                conversation,
            } => {
                let position = position.min(self.messages.len());
                self.messages.insert(position, message);
                self.conversations.restore(*conversation);
            }
        }
        Ok(())
    }

    /// Set the read flag in both layers; returns the previous value
    fn set_read(&mut self, id: MessageId, read: bool) -> Result<bool, ReconcileError> {
        let (position, key) = self.locate(id)?;
        let conversation = self
            .conversations
            .get_mut(&key)
            .ok_or_else(|| ReconcileError::UnknownConversation(key.clone()))?;
        let member = conversation
            .message_mut(id)
            .ok_or(ReconcileError::UnknownMessage(id))?;

        let was_read = member.is_read;
        member.is_read = read;
        match (was_read, read) {
            (false, true) => {
                conversation.unread_count = conversation.unread_count.saturating_sub(1)
            }
            (true, false) => conversation.unread_count += 1,
            _ => {}
        }
        self.messages[position].is_read = read;
        Ok(was_read)
    }

    fn toggle_flag(&mut self, id: MessageId, flag: Flag) -> Result<(), ReconcileError> {
        let (position, key) = self.locate(id)?;
        let conversation = self
            .conversations
            .get_mut(&key)
            .ok_or_else(|| ReconcileError::UnknownConversation(key.clone()))?;
        let member = conversation
            .message_mut(id)
            .ok_or(ReconcileError::UnknownMessage(id))?;
        flag.flip(member);

        let any = conversation.messages.iter().any(|m| flag.get(m));
        match flag {
            Flag::Starred => conversation.is_starred = any,
            Flag::Archived => conversation.is_archived = any,
        }
        flag.flip(&mut self.messages[position]);
        Ok(())
    }

    fn locate(&self, id: MessageId) -> Result<(usize, GroupKey), ReconcileError> {
        let position = self
            .messages
            .iter()
            .position(|m| m.id == id)
            .ok_or(ReconcileError::UnknownMessage(id))?;
        let key = self
            .conversations
            .key_for(id)
            .cloned()
            .ok_or(ReconcileError::UnknownMessage(id))?;
        Ok((position, key))
    }

    fn conversation_mut(&mut self, key: &GroupKey) -> Result<&mut Conversation, ReconcileError> {
        self.conversations
            .get_mut(key)
            .ok_or_else(|| ReconcileError::UnknownConversation(key.clone()))
    }
}
