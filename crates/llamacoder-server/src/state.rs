use std::sync::Arc;
use std::time::Duration;

use llamacoder_ai::vendors::openai::{OpenAiClientConfig, OpenAiProvider, OpenAiRequestOptions};
use llamacoder_ai::{CompletionProvider, ConfigError, ProviderConfig, ProviderKind};
use llamacoder_core::mcp::{DEFAULT_PROBE_TIMEOUT, McpServerRegistry};
use llamacoder_core::{ChatStore, MemoryStore};

use crate::config::ServerConfig;

pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub const DEFAULT_TITLE_MODEL: &str = "moonshotai/kimi-k2:free";

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub provider: Arc<dyn CompletionProvider>,
    pub mcp: Arc<McpServerRegistry>,
    env: EnvLookup,
    pub relay_timeout: Option<Duration>,
    pub probe_timeout: Duration,
    pub title_model: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ChatStore>,
        provider: Arc<dyn CompletionProvider>,
        mcp: Arc<McpServerRegistry>,
    ) -> Self {
        Self {
            store,
            provider,
            mcp,
            env: Arc::new(|key| std::env::var(key).ok()),
            relay_timeout: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            title_model: DEFAULT_TITLE_MODEL.to_string(),
        }
    }

    /// In-memory store, HTTP provider and file-backed registry as configured.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let provider = OpenAiProvider::new(OpenAiClientConfig::default())?;
        let mut state = Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(provider),
            Arc::new(McpServerRegistry::new(&config.data_dir)),
        );
        state.relay_timeout = config.relay_timeout();
        state.probe_timeout = config.probe_timeout();
        state.title_model = config.title_model.clone();
        Ok(state)
    }

    /// Replaces the environment lookup used for provider keys.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    pub fn env_var(&self, key: &str) -> Option<String> {
        (self.env)(key)
    }

    pub fn provider_config(
        &self,
        provider: ProviderKind,
        user_key: Option<&str>,
    ) -> Result<ProviderConfig, ConfigError> {
        ProviderConfig::resolve(provider, user_key, |key| self.env_var(key))
    }

    /// Attribution headers for upstream calls made on behalf of `chat_id`.
    pub fn request_options(&self, chat_id: &str) -> OpenAiRequestOptions {
        match self.env_var("HELICONE_API_KEY") {
            Some(key) if !key.trim().is_empty() => OpenAiRequestOptions::helicone(key.trim(), chat_id),
            _ => OpenAiRequestOptions::default(),
        }
    }
}
