//! Per-user conversation sessions and their persistence.

pub mod conversation;
pub mod lock;
pub mod store;

pub use conversation::{check_tool_pairing, ConversationSession};
pub use lock::{KeyGuard, KeyedLocks};
pub use store::{FileSessionStore, InMemorySessionStore, SessionStore};
