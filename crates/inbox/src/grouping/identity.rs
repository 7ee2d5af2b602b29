//! Thread identity classification and conversation opening
//!
//! A conversation key is only trusted as a server thread id when it looks
//! like one structurally. Misreading a genuine id as a fallback key just
//! means the loaded window is shown; the reverse would request a thread
//! that does not exist, so the check leans towards `Fallback`.

use anyhow::Result;
use log::{debug, warn};
use serde::Serialize;

use super::aggregate::fold_conversation;
use super::key::FALLBACK_SEPARATOR;
use crate::models::{Conversation, GroupKey, Message, ThreadId, ThreadIdentity};
use crate::source::MessageSource;

/// Classify a key given the conversation's member messages
///
/// Genuine only when the key has no `@`, no separator, and the first
/// member carries a non-empty thread id.
pub fn classify(key: &GroupKey, messages: &[Message]) -> ThreadIdentity {
    let key_str = key.as_str();
    let looks_opaque = !key_str.is_empty()
        && !key_str.contains('@')
        && !key_str.contains(FALLBACK_SEPARATOR);
    let first_has_thread = messages.first().is_some_and(Message::has_thread_id);

    if looks_opaque && first_has_thread {
        ThreadIdentity::Genuine(ThreadId::new(key_str))
    } else {
        ThreadIdentity::Fallback
    }
}

/// Convenience check against a built conversation's cached identity
pub fn is_genuine_thread(conversation: &Conversation) -> bool {
    conversation.identity().is_genuine()
}

/// How much of a conversation an opened view is known to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Completeness {
    /// Full server thread, independent of the page window
    Complete,
    /// Only messages from the loaded page; older or newer members that
    /// fall outside the window are absent
    Windowed,
}

/// A conversation prepared for display, messages oldest first
#[derive(Debug, Clone)]
pub struct OpenedConversation {
    pub conversation: Conversation,
    pub completeness: Completeness,
}

impl OpenedConversation {
    fn windowed(conversation: &Conversation) -> Self {
        let mut conversation = conversation.clone();
        sort_ascending(&mut conversation.messages);
        Self {
            conversation,
            completeness: Completeness::Windowed,
        }
    }
}

/// Open a conversation for display
///
/// Genuine threads are refetched in full from `source` and rebuilt as one
/// conversation; tags edited on the windowed conversation are carried over.
/// Fallback conversations, and genuine ones whose refetch comes back empty,
/// reuse the windowed aggregate as-is.
pub fn open_conversation(
    conversation: &Conversation,
    source: &dyn MessageSource,
) -> Result<OpenedConversation> {
    let ThreadIdentity::Genuine(thread_id) = conversation.identity() else {
        debug!(
            "Opening fallback conversation {} from loaded window",
            conversation.key()
        );
        return Ok(OpenedConversation::windowed(conversation));
    };

    let messages = source.fetch_thread(thread_id)?;
    debug!(
        "Fetched {} messages for thread {}",
        messages.len(),
        thread_id
    );

    let Some(mut full) = fold_conversation(conversation.key().clone(), messages) else {
        warn!(
            "Thread {} came back empty, using loaded window",
            thread_id
        );
        return Ok(OpenedConversation::windowed(conversation));
    };

    full.tags.extend(conversation.tags().iter().cloned());
    full.arrival = conversation.arrival;
    sort_ascending(&mut full.messages);

    Ok(OpenedConversation {
        conversation: full,
        completeness: Completeness::Complete,
    })
}

fn sort_ascending(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
