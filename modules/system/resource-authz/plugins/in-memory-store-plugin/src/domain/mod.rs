//! Domain layer for the in-memory store plugin.

pub mod service;
pub mod session;
mod tree;

pub use service::InMemoryStore;
pub use session::MemorySession;
pub use tree::{FILE_NAME_PROPERTY, FILE_NODE_TYPE, MIME_TYPE_PROPERTY};
