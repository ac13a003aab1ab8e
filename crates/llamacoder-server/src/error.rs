//! Error type shared by all handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use llamacoder_ai::{ConfigError, ProviderError};
use llamacoder_core::StoreError;
use llamacoder_core::mcp::McpError;
use serde::Serialize;
use tracing::error;

pub const MISSING_API_KEY_MESSAGE: &str =
    "API key is not configured. Please set up your API key in the settings.";

/// Handler error rendered as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Unknown `action` query value on a chat route.
    pub fn invalid_endpoint() -> Self {
        Self::NotFound("Invalid endpoint".into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, .. } => Self::NotFound(not_found_message(kind)),
            StoreError::Backend(message) => Self::Internal(message),
        }
    }
}

fn not_found_message(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
        None => "Not found".to_string(),
    }
}

impl From<McpError> for AppError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Validation(_) | McpError::InvalidConfig(_) => Self::BadRequest(err.to_string()),
            McpError::NotFound(_) => Self::NotFound(err.to_string()),
            McpError::Io { .. } | McpError::Json { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingApiKey { .. } => Self::Forbidden(MISSING_API_KEY_MESSAGE.into()),
            ConfigError::UnknownProvider(_) | ConfigError::Validation(_) => {
                Self::BadRequest(err.to_string())
            }
            ConfigError::Client(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        Self::Internal(err.message().to_string())
    }
}
