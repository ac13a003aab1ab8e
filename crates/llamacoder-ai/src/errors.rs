use crate::provider::ProviderKind;

/// Errors from the upstream chat-completions provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Provider returned an application-level failure (HTTP status, auth, etc.).
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderKind,
        message: String,
    },
    /// Provider response shape or event sequencing was invalid.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderKind,
        message: String,
    },
}

impl ProviderError {
    /// Creates a provider-level error.
    pub fn provider(
        provider: ProviderKind,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider,
            message: message.into(),
        }
    }

    pub fn provider_kind(&self) -> ProviderKind {
        match self {
            Self::Provider { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Protocol { provider, .. } => *provider,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Transport { message, .. }
            | Self::Protocol { message, .. } => message,
        }
    }

    /// HTTP status reported by the provider, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Invalid provider or client configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    /// Neither the request nor the environment supplied a key.
    #[error("API key is not configured for {provider}")]
    MissingApiKey { provider: ProviderKind },
    #[error("invalid client configuration: {0}")]
    Client(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Terminal error item of a relayed stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The upstream chunk source failed mid-stream.
    #[error("upstream failed: {0}")]
    Upstream(String),
    /// A chunk could not be serialized.
    #[error("failed to encode chunk: {0}")]
    Encode(String),
    /// The overall relay deadline elapsed.
    #[error("relay timed out")]
    TimedOut,
}
