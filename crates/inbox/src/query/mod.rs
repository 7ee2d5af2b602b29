//! Query API for UI consumption
//!
//! Turns conversations into flat, serializable summaries for list views.

mod conversations;

pub use conversations::{ConversationSummary, list_conversations};
