//! Storage boundary for chats and messages.
//!
//! Handlers receive an `Arc<dyn ChatStore>`; nothing reaches into process
//! globals. [`MemoryStore`] is the bundled implementation.

mod memory;

pub use memory::MemoryStore;

use crate::chat::{Chat, ChatPatch, ChatQuery, ChatWithMessages, Message, NewChat, NewMessage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// The backing store failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn chat_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "chat",
            id: id.into(),
        }
    }

    pub fn message_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "message",
            id: id.into(),
        }
    }
}

/// CRUD operations over chats and their messages.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_chat(&self, chat: NewChat) -> Result<Chat, StoreError>;

    async fn get_chat(&self, id: &str) -> Result<Option<Chat>, StoreError>;

    /// Chat plus its messages ordered by position.
    async fn get_chat_with_messages(&self, id: &str)
    -> Result<Option<ChatWithMessages>, StoreError>;

    async fn list_chats(&self, query: &ChatQuery) -> Result<Vec<ChatWithMessages>, StoreError>;

    /// Applies `patch` and bumps `updated_at`.
    async fn update_chat(&self, id: &str, patch: ChatPatch) -> Result<Chat, StoreError>;

    /// Deletes the chat and its messages.
    async fn delete_chat(&self, id: &str) -> Result<Chat, StoreError>;

    /// Returns the number of chats removed.
    async fn delete_all_chats(&self) -> Result<usize, StoreError>;

    /// Appends a message after the chat's current last position.
    async fn create_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Messages of a chat ordered by position, optionally capped at `max_position`.
    async fn messages_for_chat(
        &self,
        chat_id: &str,
        max_position: Option<i64>,
    ) -> Result<Vec<Message>, StoreError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, StoreError>;
}
