//! Scripted provider and request helpers for route tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use futures::stream;
use llamacoder_ai::{ChunkStream, CompletionProvider, CompletionRequest, ProviderConfig, ProviderError};
use llamacoder_core::MemoryStore;
use llamacoder_core::mcp::McpServerRegistry;
use tower::ServiceExt;

use crate::state::AppState;

pub(crate) enum Script {
    Chunks(Vec<Result<serde_json::Value, ProviderError>>),
    FailStart(ProviderError),
}

pub(crate) struct ScriptedProvider {
    script: Script,
    title: Option<String>,
    pub calls: Mutex<Vec<(ProviderConfig, CompletionRequest)>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            title: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<(ProviderConfig, CompletionRequest)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn start_stream(
        &self,
        config: &ProviderConfig,
        request: CompletionRequest,
    ) -> Result<ChunkStream, ProviderError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((config.clone(), request));
        match &self.script {
            Script::Chunks(chunks) => Ok(Box::pin(stream::iter(chunks.clone()))),
            Script::FailStart(err) => Err(err.clone()),
        }
    }

    async fn complete(
        &self,
        config: &ProviderConfig,
        request: CompletionRequest,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((config.clone(), request));
        self.title.clone().ok_or_else(|| {
            ProviderError::provider(config.provider, "no title scripted", Some(500))
        })
    }
}

pub(crate) fn delta(text: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": text}}]
    })
}

/// State over a fresh store with `OPENROUTER_API_KEY=sk-env` in the
/// injected environment.
pub(crate) fn test_state(data_dir: &Path, provider: Arc<ScriptedProvider>) -> AppState {
    AppState::new(
        Arc::new(MemoryStore::new()),
        provider,
        Arc::new(McpServerRegistry::new(data_dir)),
    )
    .with_env(|key| (key == "OPENROUTER_API_KEY").then(|| "sk-env".to_string()))
}

pub(crate) fn empty_provider() -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new(Script::Chunks(Vec::new())))
}

pub(crate) fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub(crate) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, headers, body)
}

pub(crate) async fn send_json(
    app: &Router,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = send(app, request).await;
    let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, value)
}
