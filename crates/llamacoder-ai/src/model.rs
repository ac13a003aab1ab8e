use std::collections::BTreeMap;
use std::time::Duration;

use crate::content::ChatMessage;

/// Sampling and transport options for one completion call.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Optional per-request timeout overriding the client default.
    pub timeout: Option<Duration>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.2),
            max_tokens: Some(9000),
            timeout: None,
        }
    }
}

impl CompletionOptions {
    /// No sampling overrides; the provider's defaults apply.
    pub fn provider_defaults() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            timeout: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A chat-completions request: model, ordered history, options.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: CompletionOptions,
    /// Extra HTTP headers for the upstream call (attribution, tracing).
    pub headers: BTreeMap<String, String>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: CompletionOptions::default(),
            headers: BTreeMap::new(),
        }
    }

    pub fn options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".into());
        }
        if self.messages.is_empty() {
            return Err("at least one message is required".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_generation_settings() {
        let options = CompletionOptions::default();
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, Some(9000));
        assert_eq!(CompletionOptions::provider_defaults().temperature, None);
    }

    #[test]
    fn validate_rejects_empty_model_and_history() {
        assert!(CompletionRequest::new(" ", vec![ChatMessage::user("x")]).validate().is_err());
        assert!(CompletionRequest::new("m", vec![]).validate().is_err());
        assert!(CompletionRequest::new("m", vec![ChatMessage::user("x")]).validate().is_ok());
    }
}
