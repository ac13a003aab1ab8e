use std::time::Duration;

/// Client-wide settings for the OpenAI-compatible HTTP client.
#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    /// Default HTTP timeout for requests.
    pub timeout: Duration,
    /// Sent as `User-Agent` on every request.
    pub user_agent: String,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            user_agent: format!("llamacoder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl OpenAiClientConfig {
    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub(crate) fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}
