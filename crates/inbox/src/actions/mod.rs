//! Inbox actions
//!
//! High-level handlers that pair local mutations with the message source:
//! refresh, open, read, delete, star, archive, tag and send.

mod handler;

pub use handler::ActionHandler;
