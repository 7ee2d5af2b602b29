//! Inbox crate - conversation reconstruction for a paginated message feed
//!
//! This crate turns a flat page of inbound/outbound messages into
//! conversations and keeps them consistent as the user acts on them:
//! - Domain models (Message, Conversation, GroupKey)
//! - Group key resolution and conversation aggregation
//! - Thread identity classification (server thread vs. fallback key)
//! - Local mutation reconciliation with undo
//! - Message source trait with in-memory and HTTP implementations
//! - Action handlers pairing local updates with persistence
//!
//! Aggregation only sees the loaded page. Conversations whose key is a
//! fallback key may be missing members that live on other pages; only
//! genuine server threads are refetched in full when opened.

pub mod actions;
pub mod compose;
pub mod config;
pub mod filter;
pub mod grouping;
pub mod inbox;
pub mod models;
pub mod query;
pub mod reconcile;
pub mod source;

pub use actions::ActionHandler;
pub use compose::{ComposeError, OutgoingMessage};
pub use config::InboxConfig;
pub use filter::{ConversationFilter, MessageFilter, StatusFilter};
pub use grouping::{
    Completeness, ConversationMap, KeyOrder, OpenedConversation, classify, is_genuine_thread,
    normalize_subject, open_conversation, resolve, resolve_with,
};
pub use inbox::{FetchTicket, Inbox};
pub use models::{Conversation, GroupKey, Message, MessageId, ThreadId, ThreadIdentity};
pub use query::{ConversationSummary, list_conversations};
pub use reconcile::{ReconcileError, Undo};
pub use source::{
    HttpMessageSource, InMemoryMessageSource, MessagePage, MessageSource, Pagination, SourceOp,
};
