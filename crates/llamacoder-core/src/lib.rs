//! Core domain for llamacoder: the code-fence segmenter, chat and message
//! records, the storage boundary, and the MCP server registry.

pub mod chat;
pub mod mcp;
pub mod observability;
pub mod segment;
pub mod store;
pub mod tags;

pub use chat::{
    Chat, ChatPatch, ChatQuery, ChatSort, ChatWithMessages, HistoryTurn, Message, NewChat,
    NewMessage, Role, history_for_completion,
};
pub use segment::{Filename, Segment, segment};
pub use store::{ChatStore, MemoryStore, StoreError};
