//! Chat and message CRUD.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use llamacoder_ai::vendors::openai::OpenAiRequestExt as _;
use llamacoder_ai::{ChatMessage, CompletionOptions, CompletionRequest, ProviderKind};
use llamacoder_core::chat::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use llamacoder_core::tags::{add_tag, parse_tags, remove_tag};
use llamacoder_core::{
    Chat, ChatPatch, ChatQuery, ChatSort, ChatWithMessages, Message, NewChat, NewMessage, Role,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

const TITLE_PROMPT: &str = "You are a chatbot helping the user create a simple app or script, and your current job is to create a succinct title, maximum 3-5 words, for the chat given their initial prompt. Please return only the title.";
const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub generate_title: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatResponse {
    pub chat: Chat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListChatsParams {
    pub search: Option<String>,
    pub tags: Option<String>,
    pub favorites: Option<String>,
    pub archived: Option<String>,
    pub sort: Option<String>,
}

impl ListChatsParams {
    fn into_query(self) -> ChatQuery {
        let sort = match self.sort.as_deref() {
            Some("updated") => ChatSort::Updated,
            Some("title") => ChatSort::Title,
            _ => ChatSort::Recent,
        };
        ChatQuery {
            search: self.search,
            tags: parse_tags(self.tags.as_deref()),
            favorites_only: self.favorites.as_deref() == Some("true"),
            archived: self.archived.as_deref() == Some("true"),
            sort,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionParams {
    pub action: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagBody {
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub file_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedCount {
    pub deleted: usize,
}

// POST /api/chats
pub async fn create_chat(
    State(state): State<AppState>,
    Json(request): Json<CreateChatRequest>,
) -> Result<Json<CreateChatResponse>, AppError> {
    let prompt = request.prompt.clone().unwrap_or_default();
    let wants_title = request.generate_title && !prompt.trim().is_empty();
    let provider = ProviderKind::from_name(request.provider.as_deref());
    let title_config = if wants_title {
        Some(state.provider_config(provider, request.api_key.as_deref())?)
    } else {
        None
    };

    let title = match request.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ if wants_title => String::new(),
        _ => DEFAULT_TITLE.to_string(),
    };
    let new_chat = NewChat::new(prompt.clone())
        .model(non_blank(request.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()))
        .quality(non_blank(request.quality).unwrap_or_else(|| "high".to_string()))
        .title(title);
    let mut chat = state.store.create_chat(new_chat).await?;
    info!(chat_id = %chat.id, model = %chat.model, "created chat");

    let mut last_message_id = None;
    if !prompt.trim().is_empty() {
        state
            .store
            .create_message(NewMessage::new(&chat.id, Role::System, DEFAULT_SYSTEM_PROMPT))
            .await?;
        let user = state
            .store
            .create_message(NewMessage::new(&chat.id, Role::User, prompt.clone()))
            .await?;
        last_message_id = Some(user.id);
    }

    if let Some(config) = title_config
        && chat.title.is_empty()
    {
        let request = CompletionRequest::new(
            state.title_model.clone(),
            vec![ChatMessage::system(TITLE_PROMPT), ChatMessage::user(prompt.clone())],
        )
        .options(CompletionOptions::provider_defaults())
        .openai_options(state.request_options(&chat.id));
        let title = match state.provider.complete(&config, request).await {
            Ok(title) if !title.trim().is_empty() => title.trim().to_string(),
            Ok(_) => prompt.trim().to_string(),
            Err(err) => {
                warn!(chat_id = %chat.id, provider = %config.provider, error = %err, "title generation failed; using prompt");
                prompt.trim().to_string()
            }
        };
        chat = state
            .store
            .update_chat(
                &chat.id,
                ChatPatch {
                    title: Some(title),
                    ..ChatPatch::default()
                },
            )
            .await?;
    }

    Ok(Json(CreateChatResponse {
        chat,
        last_message_id,
    }))
}

// GET /api/chats
pub async fn list_chats(
    State(state): State<AppState>,
    Query(params): Query<ListChatsParams>,
) -> Result<Json<Vec<ChatWithMessages>>, AppError> {
    let chats = state.store.list_chats(&params.into_query()).await?;
    Ok(Json(chats))
}

// DELETE /api/chats
pub async fn delete_all_chats(
    State(state): State<AppState>,
) -> Result<Json<DeletedCount>, AppError> {
    let deleted = state.store.delete_all_chats().await?;
    info!(deleted, "deleted all chats");
    Ok(Json(DeletedCount { deleted }))
}

// GET /api/chats/{id}
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatWithMessages>, AppError> {
    let chat = state
        .store
        .get_chat_with_messages(&id)
        .await?
        .ok_or_else(chat_not_found)?;
    Ok(Json(chat))
}

// PUT /api/chats/{id}?action=favorite|archive
pub async fn toggle_chat_flag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActionParams>,
) -> Result<Json<Chat>, AppError> {
    let toggle_favorite = match params.action.as_deref() {
        Some("favorite") => true,
        Some("archive") => false,
        _ => return Err(AppError::invalid_endpoint()),
    };
    let chat = load_chat(&state, &id).await?;
    let patch = if toggle_favorite {
        ChatPatch {
            is_favorite: Some(!chat.is_favorite),
            ..ChatPatch::default()
        }
    } else {
        ChatPatch {
            is_archived: Some(!chat.is_archived),
            ..ChatPatch::default()
        }
    };
    Ok(Json(state.store.update_chat(&id, patch).await?))
}

// POST /api/chats/{id}?action=tags
pub async fn add_chat_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActionParams>,
    body: Bytes,
) -> Result<Json<Chat>, AppError> {
    if params.action.as_deref() != Some("tags") {
        return Err(AppError::invalid_endpoint());
    }
    let body: TagBody = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".into()))?;
    let tag = body
        .tag
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Tag is required".into()))?;

    let chat = load_chat(&state, &id).await?;
    let patch = ChatPatch {
        tags: Some(add_tag(Some(&chat.tags), &tag)),
        ..ChatPatch::default()
    };
    Ok(Json(state.store.update_chat(&id, patch).await?))
}

// DELETE /api/chats/{id}[?action=tags&tag=x]
pub async fn delete_chat_or_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActionParams>,
) -> Result<Json<Chat>, AppError> {
    match (params.action.as_deref(), params.tag.as_deref()) {
        (None, _) => {
            let chat = state.store.delete_chat(&id).await?;
            info!(chat_id = %id, "deleted chat");
            Ok(Json(chat))
        }
        (Some("tags"), Some(tag)) if !tag.is_empty() => {
            let chat = load_chat(&state, &id).await?;
            let patch = ChatPatch {
                tags: Some(remove_tag(Some(&chat.tags), tag)),
                ..ChatPatch::default()
            };
            Ok(Json(state.store.update_chat(&id, patch).await?))
        }
        _ => Err(AppError::invalid_endpoint()),
    }
}

// POST /api/chats/{id}/messages
pub async fn create_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let message = state
        .store
        .create_message(
            NewMessage::new(&id, request.role, request.content).file_url(request.file_url),
        )
        .await?;
    Ok(Json(message))
}

async fn load_chat(state: &AppState, id: &str) -> Result<Chat, AppError> {
    state.store.get_chat(id).await?.ok_or_else(chat_not_found)
}

fn chat_not_found() -> AppError {
    AppError::NotFound("Chat not found".into())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::router;
    use crate::testing::{
        Script, ScriptedProvider, empty_provider, empty_request, json_request, send_json,
        test_state,
    };

    async fn create(app: &axum::Router, body: serde_json::Value) -> serde_json::Value {
        let (status, value) = send_json(app, json_request("POST", "/api/chats", body)).await;
        assert_eq!(status, StatusCode::OK, "create failed: {value}");
        value
    }

    #[tokio::test]
    async fn create_with_prompt_seeds_system_and_user_messages() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), empty_provider()));

        let created = create(&app, json!({"prompt": "a pomodoro timer"})).await;
        assert_eq!(created["chat"]["title"], "New Chat");
        assert_eq!(created["chat"]["llamaCoderVersion"], "v2");
        let id = created["chat"]["id"].as_str().unwrap().to_string();

        let (status, chat) = send_json(&app, empty_request("GET", &format!("/api/chats/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let messages = chat["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["position"], 0);
        assert_eq!(messages[1]["content"], "a pomodoro timer");
        assert_eq!(messages[1]["id"], created["lastMessageId"]);
    }

    #[tokio::test]
    async fn generated_title_comes_from_provider() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(Script::Chunks(vec![])).title(" Quiz App \n"));
        let app = router(test_state(dir.path(), provider.clone()));

        let created = create(
            &app,
            json!({"prompt": "make a quiz", "generateTitle": true, "apiKey": "sk-user"}),
        )
        .await;
        assert_eq!(created["chat"]["title"], "Quiz App");

        let calls = provider.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.api_key, "sk-user");
        assert_eq!(calls[0].1.model, "moonshotai/kimi-k2:free");
        assert_eq!(calls[0].1.messages[1].content, "make a quiz");
    }

    #[tokio::test]
    async fn failed_title_generation_falls_back_to_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), empty_provider()));
        let created = create(&app, json!({"prompt": "snake game", "generateTitle": true})).await;
        assert_eq!(created["chat"]["title"], "snake game");
    }

    #[tokio::test]
    async fn title_generation_without_any_key_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), empty_provider()).with_env(|_| None);
        let app = router(state);
        let (status, body) = send_json(
            &app,
            json_request("POST", "/api/chats", json!({"prompt": "x", "generateTitle": true})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().starts_with("API key is not configured"));
    }

    #[tokio::test]
    async fn list_filters_by_tags_favorites_and_archive() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), empty_provider()));
        let a = create(&app, json!({"title": "Alpha", "prompt": "first"})).await;
        let b = create(&app, json!({"title": "Beta", "prompt": "second"})).await;
        let a_id = a["chat"]["id"].as_str().unwrap().to_string();
        let b_id = b["chat"]["id"].as_str().unwrap().to_string();

        let (status, tagged) = send_json(
            &app,
            json_request("POST", &format!("/api/chats/{a_id}?action=tags"), json!({"tag": "work"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tagged["tags"], "work");

        let (_, fav) = send_json(&app, empty_request("PUT", &format!("/api/chats/{b_id}?action=favorite"))).await;
        assert_eq!(fav["isFavorite"], true);

        let (_, by_tag) = send_json(&app, empty_request("GET", "/api/chats?tags=work")).await;
        assert_eq!(by_tag.as_array().unwrap().len(), 1);
        assert_eq!(by_tag[0]["id"], a_id.as_str());

        let (_, favorites) = send_json(&app, empty_request("GET", "/api/chats?favorites=true")).await;
        assert_eq!(favorites[0]["id"], b_id.as_str());

        let (_, sorted) = send_json(&app, empty_request("GET", "/api/chats?sort=title")).await;
        let titles: Vec<_> = sorted.as_array().unwrap().iter().map(|c| c["title"].clone()).collect();
        assert_eq!(titles, vec![json!("Alpha"), json!("Beta")]);

        send_json(&app, empty_request("PUT", &format!("/api/chats/{a_id}?action=archive"))).await;
        let (_, active) = send_json(&app, empty_request("GET", "/api/chats")).await;
        assert_eq!(active.as_array().unwrap().len(), 1);
        let (_, archived) = send_json(&app, empty_request("GET", "/api/chats?archived=true")).await;
        assert_eq!(archived[0]["id"], a_id.as_str());
    }

    #[tokio::test]
    async fn tag_routes_validate_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), empty_provider()));
        let chat = create(&app, json!({"title": "T"})).await;
        let id = chat["chat"]["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(
            &app,
            json_request("POST", &format!("/api/chats/{id}?action=tags"), json!({"tag": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tag is required");

        for tag in ["ui", "demo", "ui"] {
            send_json(
                &app,
                json_request("POST", &format!("/api/chats/{id}?action=tags"), json!({"tag": tag})),
            )
            .await;
        }
        let (_, removed) = send_json(
            &app,
            empty_request("DELETE", &format!("/api/chats/{id}?action=tags&tag=ui")),
        )
        .await;
        assert_eq!(removed["tags"], "demo");
    }

    #[tokio::test]
    async fn unknown_actions_and_missing_chats_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), empty_provider()));
        let chat = create(&app, json!({})).await;
        let id = chat["chat"]["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(&app, empty_request("PUT", &format!("/api/chats/{id}?action=pin"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Invalid endpoint");

        let (status, _) = send_json(&app, empty_request("DELETE", &format!("/api/chats/{id}?action=tags"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send_json(&app, empty_request("PUT", "/api/chats/missing?action=favorite")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Chat not found");

        let (status, _) = send_json(&app, empty_request("GET", "/api/chats/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn messages_append_and_chats_delete() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path(), empty_provider()));
        let chat = create(&app, json!({"prompt": "hi"})).await;
        let id = chat["chat"]["id"].as_str().unwrap().to_string();

        let (status, message) = send_json(
            &app,
            json_request(
                "POST",
                &format!("/api/chats/{id}/messages"),
                json!({"role": "assistant", "content": "done", "fileUrl": "https://x/y.png"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(message["position"], 2);
        assert_eq!(message["fileUrl"], "https://x/y.png");

        let (status, _) = send_json(
            &app,
            json_request("POST", "/api/chats/missing/messages", json!({"role": "user", "content": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send_json(&app, empty_request("DELETE", &format!("/api/chats/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        create(&app, json!({})).await;
        let (_, deleted) = send_json(&app, empty_request("DELETE", "/api/chats")).await;
        assert_eq!(deleted["deleted"], 1);
    }
}
