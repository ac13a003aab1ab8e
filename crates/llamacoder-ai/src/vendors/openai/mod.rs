//! OpenAI-compatible chat-completions integration.
//!
//! OpenRouter, OpenAI and Mistral all speak this wire format; the endpoint
//! and key come from [`crate::ProviderConfig`] on every call.
mod adapter;
mod config;
mod options;
pub(crate) mod transport;

pub use adapter::OpenAiProvider;
pub use config::OpenAiClientConfig;
pub use options::OpenAiRequestOptions;

use crate::model::CompletionRequest;

/// Extension trait for attaching OpenAI-compatible options to a request.
pub trait OpenAiRequestExt {
    /// Merges the option headers into the request. Later values win.
    fn openai_options(self, options: OpenAiRequestOptions) -> Self;
}

impl OpenAiRequestExt for CompletionRequest {
    fn openai_options(mut self, options: OpenAiRequestOptions) -> Self {
        self.headers.extend(options.headers);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ChatMessage;

    #[test]
    fn openai_options_merge_into_request_headers() {
        let request = CompletionRequest::new("m", vec![ChatMessage::user("hi")])
            .openai_options(OpenAiRequestOptions::default().header("X-Title", "first"))
            .openai_options(OpenAiRequestOptions::helicone("hk", "chat-9"));
        assert_eq!(request.headers["X-Title"], "LlamaCoder");
        assert_eq!(request.headers["Helicone-Session-Id"], "chat-9");
        assert_eq!(request.headers.len(), 6);
    }
}
