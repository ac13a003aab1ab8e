//! Provider selection: which OpenAI-compatible endpoint to call and with
//! which key. Resolved once per request, outside the relay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Supported upstream providers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenRouter,
    OpenAi,
    Anthropic,
    Mistral,
    Bedrock,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenRouter,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Mistral,
        ProviderKind::Bedrock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Bedrock => "bedrock",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Mistral => "https://api.mistral.ai/v1",
            ProviderKind::Bedrock => "bedrock",
        }
    }

    /// Environment variable consulted when the request carries no key.
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Mistral => "MISTRAL_API_KEY",
            ProviderKind::Bedrock => "AWS_ACCESS_KEY_ID",
        }
    }

    /// Lenient parse used for request payloads: unknown or missing names
    /// select OpenRouter.
    pub fn from_name(name: Option<&str>) -> Self {
        name.and_then(|n| n.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

/// Endpoint and credentials for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    /// Picks the key for `provider`: a non-blank `user_key` wins, then the
    /// provider's environment variable looked up through `env`.
    pub fn resolve<F>(
        provider: ProviderKind,
        user_key: Option<&str>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = user_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| {
                env(provider.env_key())
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
            .ok_or(ConfigError::MissingApiKey { provider })?;
        Ok(Self {
            provider,
            base_url: provider.base_url().to_string(),
            api_key,
        })
    }

    /// [`ProviderConfig::resolve`] against the process environment.
    pub fn from_env(provider: ProviderKind, user_key: Option<&str>) -> Result<Self, ConfigError> {
        Self::resolve(provider, user_key, |key| std::env::var(key).ok())
    }

    /// Overrides the base URL (proxies, local test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Per-provider API keys as kept in the user's settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub openrouter: String,
    #[serde(default)]
    pub openai: String,
    #[serde(default)]
    pub anthropic: String,
    #[serde(default)]
    pub bedrock: String,
    #[serde(default)]
    pub mistral: String,
}

impl ApiKeys {
    pub fn get(&self, provider: ProviderKind) -> &str {
        match provider {
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Mistral => &self.mistral,
            ProviderKind::Bedrock => &self.bedrock,
        }
    }
}

/// Provider, model, and keys chosen by the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_keys: ApiKeys,
}

fn default_model() -> String {
    "qwen/qwen3-coder:free".to_string()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl UserSettings {
    /// Resolves the endpoint for the selected provider.
    pub fn provider_config<F>(&self, env: F) -> Result<ProviderConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        ProviderConfig::resolve(self.provider, Some(self.api_keys.get(self.provider)), env)
    }

    /// True when a key is available from the settings or the environment.
    pub fn is_api_key_configured<F>(&self, env: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.provider_config(env).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" mistral ".parse::<ProviderKind>().unwrap(), ProviderKind::Mistral);
        assert!(matches!(
            "cohere".parse::<ProviderKind>(),
            Err(ConfigError::UnknownProvider(_))
        ));
        assert_eq!(ProviderKind::from_name(Some("cohere")), ProviderKind::OpenRouter);
        assert_eq!(ProviderKind::from_name(None), ProviderKind::OpenRouter);
    }

    #[test]
    fn user_key_wins_over_env() {
        let config = ProviderConfig::resolve(ProviderKind::OpenAi, Some(" sk-user "), |_| {
            Some("sk-env".into())
        })
        .unwrap();
        assert_eq!(config.api_key, "sk-user");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn blank_user_key_falls_back_to_provider_env_var() {
        let config = ProviderConfig::resolve(ProviderKind::Mistral, Some("  "), |key| {
            (key == "MISTRAL_API_KEY").then(|| "sk-mistral".to_string())
        })
        .unwrap();
        assert_eq!(config.api_key, "sk-mistral");
        assert_eq!(config.base_url, "https://api.mistral.ai/v1");
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = ProviderConfig::resolve(ProviderKind::OpenRouter, None, no_env).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingApiKey {
                provider: ProviderKind::OpenRouter
            }
        );
    }

    #[test]
    fn debug_redacts_key() {
        let config = ProviderConfig::resolve(ProviderKind::OpenAi, Some("sk-secret"), no_env)
            .unwrap();
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn settings_defaults_and_key_detection() {
        let mut settings: UserSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, UserSettings::default());
        assert_eq!(settings.model, "qwen/qwen3-coder:free");
        assert!(!settings.is_api_key_configured(no_env));
        assert!(settings.is_api_key_configured(|key| {
            (key == "OPENROUTER_API_KEY").then(|| "k".to_string())
        }));

        settings.provider = ProviderKind::Anthropic;
        settings.api_keys.anthropic = "sk-ant".into();
        let config = settings.provider_config(no_env).unwrap();
        assert_eq!(config.provider, ProviderKind::Anthropic);
        assert_eq!(config.api_key, "sk-ant");
    }
}
