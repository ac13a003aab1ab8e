//! Chat and message records plus the query and history helpers built on them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tags::parse_tags;

/// System prompt used when a chat has no stored history yet.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful coding assistant. Generate complete, working code based on the user's request.";
/// User prompt used when neither history nor a prompt is available.
pub const DEFAULT_USER_PROMPT: &str = "Create a simple web application.";
/// Number of most recent messages forwarded to the model.
pub const HISTORY_LIMIT: usize = 10;
/// Generator version stamped on new chats.
pub const LLAMACODER_VERSION: &str = "v2";
/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "qwen/qwen3-coder:free";

/// Random 16-character identifier.
pub fn new_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub model: String,
    pub quality: String,
    pub prompt: String,
    pub title: String,
    pub llama_coder_version: String,
    pub shadcn: bool,
    /// Comma-separated tags; see [`crate::tags`].
    pub tags: String,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn tag_list(&self) -> Vec<String> {
        parse_tags(Some(&self.tags))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// A chat together with its messages ordered by position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithMessages {
    #[serde(flatten)]
    pub chat: Chat,
    pub messages: Vec<Message>,
}

/// Fields supplied when creating a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewChat {
    pub model: String,
    pub quality: String,
    pub prompt: String,
    pub title: String,
}

impl NewChat {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            quality: "high".to_string(),
            prompt: prompt.into(),
            title: String::new(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Partial update for a chat. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatPatch {
    pub title: Option<String>,
    pub tags: Option<String>,
    pub is_favorite: Option<bool>,
    pub is_archived: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub file_url: Option<String>,
}

impl NewMessage {
    pub fn new(chat_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            role,
            content: content.into(),
            file_url: None,
        }
    }

    pub fn file_url(mut self, url: Option<String>) -> Self {
        self.file_url = url.filter(|u| !u.trim().is_empty());
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSort {
    /// Newest first by creation time.
    #[default]
    Recent,
    /// Most recently updated first.
    Updated,
    /// Alphabetical by title.
    Title,
}

/// Filters applied when listing chats.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatQuery {
    /// Case-insensitive substring matched against title and prompt.
    pub search: Option<String>,
    /// Every listed tag must be present on the chat.
    pub tags: Vec<String>,
    pub favorites_only: bool,
    /// `false` hides archived chats, `true` shows only archived chats.
    pub archived: bool,
    pub sort: ChatSort,
}

impl ChatQuery {
    pub fn matches(&self, chat: &Chat) -> bool {
        if chat.is_archived != self.archived {
            return false;
        }
        if self.favorites_only && !chat.is_favorite {
            return false;
        }
        if let Some(search) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let needle = search.to_lowercase();
            if !chat.title.to_lowercase().contains(&needle)
                && !chat.prompt.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if !self.tags.is_empty() {
            let chat_tags = chat.tag_list();
            if !self.tags.iter().all(|tag| chat_tags.contains(tag)) {
                return false;
            }
        }
        true
    }

    pub fn sort_chats(&self, chats: &mut [Chat]) {
        match self.sort {
            ChatSort::Recent => chats.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ChatSort::Updated => chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            ChatSort::Title => chats.sort_by(|a, b| a.title.cmp(&b.title)),
        }
    }
}

/// One prior turn forwarded to the completion endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Builds the completion history from stored messages.
///
/// Keeps the last `limit` messages (by position, oldest first). A chat
/// without stored messages falls back to the default system prompt followed
/// by `fallback_prompt`.
pub fn history_for_completion(
    messages: &[Message],
    limit: usize,
    fallback_prompt: Option<&str>,
) -> Vec<HistoryTurn> {
    let mut ordered: Vec<&Message> = messages.iter().collect();
    ordered.sort_by_key(|m| m.position);
    let skip = ordered.len().saturating_sub(limit);
    let history: Vec<HistoryTurn> = ordered
        .into_iter()
        .skip(skip)
        .map(|m| HistoryTurn::new(m.role.as_str(), m.content.clone()))
        .collect();
    if !history.is_empty() {
        return history;
    }

    let prompt = fallback_prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_USER_PROMPT);
    vec![
        HistoryTurn::new(Role::System.as_str(), DEFAULT_SYSTEM_PROMPT),
        HistoryTurn::new(Role::User.as_str(), prompt),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn chat(title: &str, prompt: &str) -> Chat {
        let now = Utc::now();
        Chat {
            id: new_id(),
            model: DEFAULT_MODEL.into(),
            quality: "high".into(),
            prompt: prompt.into(),
            title: title.into(),
            llama_coder_version: LLAMACODER_VERSION.into(),
            shadcn: true,
            tags: String::new(),
            is_favorite: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn message(position: i64, role: Role, content: &str) -> Message {
        Message {
            id: new_id(),
            chat_id: "c".into(),
            role,
            content: content.into(),
            file_url: None,
            position,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_id_is_sixteen_hex_chars() {
        let id = new_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_id());
    }

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!("Assistant".parse::<Role>(), Ok(Role::Assistant));
        assert!("tool".parse::<Role>().is_err());
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn query_filters_archived_search_favorites_and_tags() {
        let mut a = chat("Todo App", "make a todo list");
        a.tags = "ui,react".into();
        a.is_favorite = true;
        let b = chat("Blog", "a blog with posts");
        let mut c = chat("Old", "archived thing");
        c.is_archived = true;

        let default = ChatQuery::default();
        assert!(default.matches(&a) && default.matches(&b) && !default.matches(&c));

        let archived = ChatQuery {
            archived: true,
            ..Default::default()
        };
        assert!(archived.matches(&c) && !archived.matches(&a));

        let search = ChatQuery {
            search: Some("POSTS".into()),
            ..Default::default()
        };
        assert!(search.matches(&b) && !search.matches(&a));

        let favorites = ChatQuery {
            favorites_only: true,
            ..Default::default()
        };
        assert!(favorites.matches(&a) && !favorites.matches(&b));

        let tags = ChatQuery {
            tags: vec!["react".into(), "ui".into()],
            ..Default::default()
        };
        assert!(tags.matches(&a) && !tags.matches(&b));
    }

    #[test]
    fn sort_orders() {
        let mut first = chat("b", "");
        let mut second = chat("a", "");
        second.created_at = first.created_at + Duration::seconds(5);
        first.updated_at = second.created_at + Duration::seconds(5);
        let mut chats = vec![first.clone(), second.clone()];

        ChatQuery::default().sort_chats(&mut chats);
        assert_eq!(chats[0].id, second.id);

        let updated = ChatQuery {
            sort: ChatSort::Updated,
            ..Default::default()
        };
        updated.sort_chats(&mut chats);
        assert_eq!(chats[0].id, first.id);

        let title = ChatQuery {
            sort: ChatSort::Title,
            ..Default::default()
        };
        title.sort_chats(&mut chats);
        assert_eq!(chats[0].title, "a");
    }

    #[test]
    fn history_keeps_last_messages_in_position_order() {
        let messages: Vec<Message> = (0..12)
            .rev()
            .map(|i| message(i, Role::User, &format!("m{i}")))
            .collect();
        let history = history_for_completion(&messages, HISTORY_LIMIT, None);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "m2");
        assert_eq!(history[9].content, "m11");
    }

    #[test]
    fn history_falls_back_to_system_and_prompt() {
        let history = history_for_completion(&[], HISTORY_LIMIT, Some("build a game"));
        assert_eq!(
            history,
            vec![
                HistoryTurn::new("system", DEFAULT_SYSTEM_PROMPT),
                HistoryTurn::new("user", "build a game"),
            ]
        );
        let history = history_for_completion(&[], HISTORY_LIMIT, Some("  "));
        assert_eq!(history[1].content, DEFAULT_USER_PROMPT);
    }

    #[test]
    fn chat_with_messages_serializes_flat_camel_case() {
        let value = serde_json::to_value(ChatWithMessages {
            chat: chat("t", "p"),
            messages: vec![message(0, Role::Assistant, "hi")],
        })
        .unwrap();
        assert_eq!(value["title"], "t");
        assert_eq!(value["isFavorite"], false);
        assert_eq!(value["llamaCoderVersion"], "v2");
        assert_eq!(value["messages"][0]["role"], "assistant");
        assert!(value["messages"][0].get("fileUrl").is_none());
    }
}
