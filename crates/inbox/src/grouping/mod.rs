//! Reconstruction of conversations from a flat message list
//!
//! - [`key`] resolves the group key of a single message
//! - [`aggregate`] folds messages into per-key conversations
//! - [`identity`] decides whether a key is a real server thread id

pub mod aggregate;
pub mod identity;
pub mod key;

pub use aggregate::{ConversationMap, fold_conversation};
pub use identity::{
    Completeness, OpenedConversation, classify, is_genuine_thread, open_conversation,
};
pub use key::{KeyOrder, normalize_subject, resolve, resolve_with};
