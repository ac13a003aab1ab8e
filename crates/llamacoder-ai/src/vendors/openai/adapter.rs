use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::completion::CompletionProvider;
use crate::errors::{ConfigError, ProviderError};
use crate::model::CompletionRequest;
use crate::provider::{ProviderConfig, ProviderKind};
use crate::stream::ChunkStream;

use super::config::{OpenAiClientConfig, chat_completions_url};
use super::transport::{
    FrameAction, SseDecoder, SseFrame, extract_message_text, map_frame, provider_error_from_body,
};

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Chat-completions client for any OpenAI-compatible endpoint
/// (OpenRouter, OpenAI, Mistral, ...).
pub struct OpenAiProvider {
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::Client(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn send(
        &self,
        config: &ProviderConfig,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let provider = config.provider;
        request
            .validate()
            .map_err(|msg| ProviderError::protocol(provider, msg))?;
        let body = build_request_body(request, stream);
        let url = chat_completions_url(&config.base_url);
        debug!(provider = %provider, model = %request.model, stream, messages = request.messages.len(), "sending chat completion request");

        let mut http_req = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&body);
        for (name, value) in &request.headers {
            http_req = http_req.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.options.timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = http_req.send().await.map_err(|e| {
            ProviderError::transport(provider, format!("chat completion request failed: {e}"))
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(error_from_status(provider, status.as_u16(), &text))
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn start_stream(
        &self,
        config: &ProviderConfig,
        request: CompletionRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let response = self.send(config, &request, true).await?;
        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(chunk_stream(config.provider, bytes_stream)))
    }

    async fn complete(
        &self,
        config: &ProviderConfig,
        request: CompletionRequest,
    ) -> Result<String, ProviderError> {
        let provider = config.provider;
        let response = self.send(config, &request, false).await?;
        let value: serde_json::Value = response.json().await.map_err(|e| {
            ProviderError::protocol(provider, format!("invalid completion response: {e}"))
        })?;
        if let Some(error) = value.get("error") {
            return Err(provider_error_from_body(provider, error, None));
        }
        extract_message_text(&value).ok_or_else(|| {
            ProviderError::protocol(provider, "completion response has no message content")
        })
    }
}

pub(crate) fn build_request_body(request: &CompletionRequest, stream: bool) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": request.model,
        "messages": request.messages,
        "stream": stream,
    });
    if let Some(temperature) = request.options.temperature {
        body["temperature"] = serde_json::json!(temperature);
    }
    if let Some(max_tokens) = request.options.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    body
}

fn error_from_status(provider: ProviderKind, status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if value.get("error").is_some() => {
            provider_error_from_body(provider, &value["error"], Some(status))
        }
        _ => ProviderError::provider(
            provider,
            format!("chat completion request failed with status {status}: {body}"),
            Some(status),
        ),
    }
}

fn chunk_stream(
    provider: ProviderKind,
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<serde_json::Value, ProviderError>> + Send {
    struct State {
        provider: ProviderKind,
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<serde_json::Value>,
        error: Option<ProviderError>,
        done: bool,
    }

    impl State {
        /// Queues chunks from `frames` until `[DONE]` or a failing frame.
        fn absorb(&mut self, frames: Vec<SseFrame>) {
            for frame in frames {
                match map_frame(self.provider, &frame) {
                    Ok(FrameAction::Chunk(value)) => self.pending.push_back(value),
                    Ok(FrameAction::Done) => {
                        self.done = true;
                        return;
                    }
                    Ok(FrameAction::Skip) => {}
                    Err(err) => {
                        self.error = Some(err);
                        self.done = true;
                        return;
                    }
                }
            }
        }
    }

    stream::try_unfold(
        State {
            provider,
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            error: None,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Ok(Some((chunk, state)));
                }
                if let Some(err) = state.error.take() {
                    return Err(err);
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(bytes)) => {
                        let frames = state.decoder.push_chunk(&bytes);
                        state.absorb(frames);
                    }
                    Some(Err(e)) => {
                        state.error = Some(ProviderError::transport(
                            state.provider,
                            format!("streaming read failed: {e}"),
                        ));
                        state.done = true;
                    }
                    None => {
                        let trailing = state.decoder.finish().into_iter().collect();
                        state.absorb(trailing);
                        state.done = true;
                    }
                }
            }
        },
    )
}
