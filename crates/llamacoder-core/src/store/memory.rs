use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::{ChatStore, StoreError};
use crate::chat::{
    Chat, ChatPatch, ChatQuery, ChatWithMessages, LLAMACODER_VERSION, Message, NewChat,
    NewMessage, new_id,
};

/// In-process store backed by concurrent maps.
#[derive(Default)]
pub struct MemoryStore {
    chats: DashMap<String, Chat>,
    messages: DashMap<String, Message>,
    /// Next message position per chat, only touched while the chat entry is locked.
    next_positions: DashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn chat_messages(&self, chat_id: &str, max_position: Option<i64>) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.chat_id == chat_id)
            .filter(|entry| max_position.is_none_or(|max| entry.position <= max))
            .map(|entry| entry.value().clone())
            .collect();
        messages.sort_by_key(|m| m.position);
        messages
    }
}

#[async_trait::async_trait]
impl ChatStore for MemoryStore {
    async fn create_chat(&self, chat: NewChat) -> Result<Chat, StoreError> {
        let now = Utc::now();
        let chat = Chat {
            id: new_id(),
            model: chat.model,
            quality: chat.quality,
            prompt: chat.prompt,
            title: chat.title,
            llama_coder_version: LLAMACODER_VERSION.to_string(),
            shadcn: true,
            tags: String::new(),
            is_favorite: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };
        self.chats.insert(chat.id.clone(), chat.clone());
        debug!(chat_id = %chat.id, total = self.chats.len(), "stored chat");
        Ok(chat)
    }

    async fn get_chat(&self, id: &str) -> Result<Option<Chat>, StoreError> {
        Ok(self.chats.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_chat_with_messages(
        &self,
        id: &str,
    ) -> Result<Option<ChatWithMessages>, StoreError> {
        let Some(chat) = self.get_chat(id).await? else {
            return Ok(None);
        };
        let messages = self.chat_messages(id, None);
        Ok(Some(ChatWithMessages { chat, messages }))
    }

    async fn list_chats(&self, query: &ChatQuery) -> Result<Vec<ChatWithMessages>, StoreError> {
        let mut chats: Vec<Chat> = self
            .chats
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        query.sort_chats(&mut chats);
        Ok(chats
            .into_iter()
            .map(|chat| {
                let messages = self.chat_messages(&chat.id, None);
                ChatWithMessages { chat, messages }
            })
            .collect())
    }

    async fn update_chat(&self, id: &str, patch: ChatPatch) -> Result<Chat, StoreError> {
        let mut entry = self
            .chats
            .get_mut(id)
            .ok_or_else(|| StoreError::chat_not_found(id))?;
        let chat = entry.value_mut();
        if let Some(title) = patch.title {
            chat.title = title;
        }
        if let Some(tags) = patch.tags {
            chat.tags = tags;
        }
        if let Some(is_favorite) = patch.is_favorite {
            chat.is_favorite = is_favorite;
        }
        if let Some(is_archived) = patch.is_archived {
            chat.is_archived = is_archived;
        }
        chat.updated_at = Utc::now();
        Ok(chat.clone())
    }

    async fn delete_chat(&self, id: &str) -> Result<Chat, StoreError> {
        let (_, chat) = self
            .chats
            .remove(id)
            .ok_or_else(|| StoreError::chat_not_found(id))?;
        self.next_positions.remove(id);
        self.messages.retain(|_, message| message.chat_id != id);
        debug!(chat_id = %id, "deleted chat");
        Ok(chat)
    }

    async fn delete_all_chats(&self) -> Result<usize, StoreError> {
        let removed = self.chats.len();
        self.chats.clear();
        self.next_positions.clear();
        self.messages.clear();
        Ok(removed)
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        // Chat entry stays write-locked until the message is inserted.
        let _chat = self
            .chats
            .get_mut(&message.chat_id)
            .ok_or_else(|| StoreError::chat_not_found(message.chat_id.clone()))?;
        let position = {
            let mut next = self.next_positions.entry(message.chat_id.clone()).or_insert(0);
            let position = *next;
            *next += 1;
            position
        };
        let message = Message {
            id: new_id(),
            chat_id: message.chat_id,
            role: message.role,
            content: message.content,
            file_url: message.file_url,
            position,
            created_at: Utc::now(),
        };
        self.messages.insert(message.id.clone(), message.clone());
        debug!(chat_id = %message.chat_id, message_id = %message.id, position, "stored message");
        Ok(message)
    }

    async fn messages_for_chat(
        &self,
        chat_id: &str,
        max_position: Option<i64>,
    ) -> Result<Vec<Message>, StoreError> {
        Ok(self.chat_messages(chat_id, max_position))
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, StoreError> {
        Ok(self.messages.get(id).map(|entry| entry.value().clone()))
    }
}
