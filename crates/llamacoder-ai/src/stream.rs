use std::pin::Pin;

use crate::errors::ProviderError;

/// Provider chunks in arrival order. Each item is one `chat.completion.chunk`
/// payload, kept as opaque JSON so it can be forwarded verbatim.
pub type ChunkStream =
    Pin<Box<dyn futures::Stream<Item = Result<serde_json::Value, ProviderError>> + Send>>;

/// Text delta carried by a chunk (`choices[0].delta.content`).
pub fn chunk_text(chunk: &serde_json::Value) -> Option<&str> {
    chunk
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
}

/// Finish reason carried by the last chunk of a completion, if any.
pub fn chunk_finish_reason(chunk: &serde_json::Value) -> Option<&str> {
    chunk
        .get("choices")?
        .get(0)?
        .get("finish_reason")?
        .as_str()
}
