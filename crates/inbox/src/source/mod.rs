//! Message sources
//!
//! The engine never stores or transports messages itself. It consumes a
//! [`MessageSource`]: an in-memory one for tests and demos, and an HTTP one
//! for the REST backend.

mod http;
mod memory;
mod traits;

pub use http::HttpMessageSource;
pub use memory::{InMemoryMessageSource, SourceOp};
pub use traits::{DEFAULT_PAGE_SIZE, MessagePage, MessageSource, Pagination};
