//! Chat-completions client and stream relay for llamacoder.
//!
//! Vendor-specific APIs are namespaced under `vendors::*`.
//!
//! # Streaming a completion to an event-stream body
//!
//! ```no_run
//! use futures::StreamExt as _;
//! use llamacoder_ai::vendors::openai::{OpenAiClientConfig, OpenAiProvider};
//! use llamacoder_ai::{
//!     ChatMessage, CompletionProvider, CompletionRequest, ProviderConfig, ProviderKind,
//!     RelayOptions, relay,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::from_env(ProviderKind::OpenRouter, None)?;
//! let provider = OpenAiProvider::new(OpenAiClientConfig::default())?;
//! let request = CompletionRequest::new(
//!     "qwen/qwen3-coder:free",
//!     vec![ChatMessage::user("Build a counter in React.")],
//! );
//!
//! let upstream = provider.start_stream(&config, request).await?;
//! let mut body = relay(upstream, RelayOptions::default())?;
//! while let Some(record) = body.next().await {
//!     print!("{}", String::from_utf8_lossy(&record?));
//! }
//! # Ok(())
//! # }
//! ```

/// The backend contract used by the HTTP layer.
pub mod completion;
/// Chat history entries sent upstream.
pub mod content;
/// Public error types.
pub mod errors;
/// Completion request and sampling options.
pub mod model;
/// Provider selection and key resolution.
pub mod provider;
/// Upstream chunks to event-stream records.
pub mod relay;
/// Chunk stream type and chunk accessors.
pub mod stream;
/// Vendor-specific integrations and extension traits.
pub mod vendors;

pub use completion::CompletionProvider;
pub use content::ChatMessage;
pub use errors::{ConfigError, ProviderError, RelayError};
pub use model::{CompletionOptions, CompletionRequest};
pub use provider::{ApiKeys, ProviderConfig, ProviderKind, UserSettings};
pub use relay::{AbortHandle, RelayOptions, RelayStream, encode_record, relay, sentinel_record};
pub use stream::{ChunkStream, chunk_finish_reason, chunk_text};
