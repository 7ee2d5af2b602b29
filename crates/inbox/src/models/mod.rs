//! Domain models for messages and conversations

mod conversation;
mod message;

pub use conversation::{Conversation, GroupKey, ThreadIdentity};
pub use message::{Message, MessageBuilder, MessageId, ThreadId};
