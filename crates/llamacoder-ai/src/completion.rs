use crate::errors::ProviderError;
use crate::model::CompletionRequest;
use crate::provider::ProviderConfig;
use crate::stream::ChunkStream;

/// Contract for chat-completions backends.
///
/// The endpoint and key are passed per call so one client can serve every
/// provider the user may select.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Starts a streaming completion. Errors returned here happen before any
    /// chunk was produced; later failures arrive as stream items.
    async fn start_stream(
        &self,
        config: &ProviderConfig,
        request: CompletionRequest,
    ) -> Result<ChunkStream, ProviderError>;

    /// Runs a non-streaming completion and returns the assistant text.
    async fn complete(
        &self,
        config: &ProviderConfig,
        request: CompletionRequest,
    ) -> Result<String, ProviderError>;
}
