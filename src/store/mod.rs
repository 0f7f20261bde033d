//! Conversation persistence backed by `SQLite`.

pub mod conversation_store;
pub mod errors;
pub mod message;

pub use conversation_store::{ConversationStore, SqliteConversationStore, StoreFuture};
pub use errors::{StoreError, StoreResult};
pub use message::{Message, Role};
