use crate::errors::ProviderError;
use crate::provider::ProviderKind;

const DONE: &str = "[DONE]";

/// One server-sent event: optional `event:` name plus joined `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE parser fed with arbitrary byte chunks.
///
/// Bytes are buffered until a blank line ends an event, so frames split
/// across network reads are reassembled. Both `\n` and `\r\n` line endings
/// are accepted.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(newline) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(frame) = self.accept_line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buf.is_empty() {
            let raw = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            // A lone partial line can itself complete an event.
            let _ = self.accept_line(&line);
        }
        self.take_frame()
    }

    fn accept_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.take_frame();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// What a decoded frame means for the chunk stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FrameAction {
    Chunk(serde_json::Value),
    Done,
    Skip,
}

pub(crate) fn map_frame(
    provider: ProviderKind,
    frame: &SseFrame,
) -> Result<FrameAction, ProviderError> {
    let data = frame.data.trim();
    if data.is_empty() {
        return Ok(FrameAction::Skip);
    }
    if data == DONE {
        return Ok(FrameAction::Done);
    }
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        ProviderError::protocol(provider, format!("invalid SSE JSON frame: {e}"))
    })?;
    if let Some(error) = value.get("error") {
        return Err(provider_error_from_body(provider, error, None));
    }
    Ok(FrameAction::Chunk(value))
}

/// Builds a provider error from an OpenAI-style `error` object or string.
pub(crate) fn provider_error_from_body(
    provider: ProviderKind,
    error: &serde_json::Value,
    status_code: Option<u16>,
) -> ProviderError {
    let message = error
        .get("message")
        .and_then(|v| v.as_str())
        .or_else(|| error.as_str())
        .unwrap_or("upstream stream error");
    let status_code = status_code.or_else(|| {
        error
            .get("code")
            .and_then(|v| v.as_u64())
            .and_then(|c| u16::try_from(c).ok())
    });
    ProviderError::provider(provider, message, status_code)
}

/// Assistant text of a non-streaming completion response.
pub(crate) fn extract_message_text(response: &serde_json::Value) -> Option<String> {
    response
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(ToOwned::to_owned)
}
