//! `POST /api/get-next-completion-stream-promise`: streams the next
//! assistant turn for a chat as `text/event-stream`.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::Response;
use llamacoder_ai::vendors::openai::OpenAiRequestExt as _;
use llamacoder_ai::{ChatMessage, CompletionRequest, ProviderKind, RelayOptions, relay};
use llamacoder_core::chat::HISTORY_LIMIT;
use llamacoder_core::{StoreError, history_for_completion};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStreamRequest {
    pub chat_id: String,
    pub model: String,
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Limits history to messages up to and including this one.
    #[serde(default)]
    pub message_id: Option<String>,
}

pub async fn stream_completion(
    State(state): State<AppState>,
    Json(request): Json<CompletionStreamRequest>,
) -> Result<Response, AppError> {
    let max_position = match request.message_id.as_deref() {
        Some(message_id) => state
            .store
            .get_message(message_id)
            .await?
            .filter(|m| m.chat_id == request.chat_id)
            .map(|m| m.position),
        None => None,
    };
    let stored = match state
        .store
        .messages_for_chat(&request.chat_id, max_position)
        .await
    {
        Ok(messages) => messages,
        Err(StoreError::NotFound { .. }) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let history: Vec<ChatMessage> =
        history_for_completion(&stored, HISTORY_LIMIT, request.user_prompt.as_deref())
            .into_iter()
            .map(|turn| ChatMessage::new(turn.role, turn.content))
            .collect();
    debug!(chat_id = %request.chat_id, stored = stored.len(), history = history.len(), "built completion history");

    let provider = ProviderKind::from_name(request.provider.as_deref());
    let config = state.provider_config(provider, request.api_key.as_deref())?;
    let completion = CompletionRequest::new(request.model.clone(), history)
        .openai_options(state.request_options(&request.chat_id));

    let upstream = state.provider.start_stream(&config, completion).await?;
    info!(chat_id = %request.chat_id, model = %request.model, provider = %provider, "streaming completion");

    let mut options = RelayOptions::default();
    if let Some(timeout) = state.relay_timeout {
        options = options.timeout(timeout);
    }
    let records = relay(upstream, options)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(records))
        .map_err(|e| AppError::Internal(format!("failed to build stream response: {e}")))
}
