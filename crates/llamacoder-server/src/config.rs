use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::state::DEFAULT_TITLE_MODEL;

/// llamacoder HTTP server
#[derive(Clone, Debug, Parser)]
#[command(name = "llamacoder-server")]
#[command(about = "Chat storage, completion streaming and MCP registry for llamacoder")]
#[command(version)]
pub struct ServerConfig {
    /// Listen address
    #[arg(long, env = "LLAMACODER_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Directory holding the MCP registry files
    #[arg(long, env = "LLAMACODER_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Upper bound on one streamed completion, in seconds (0 disables)
    #[arg(long, env = "LLAMACODER_REQUEST_TIMEOUT_SECS", default_value_t = 45)]
    pub request_timeout_secs: u64,

    /// MCP server liveness probe timeout, in milliseconds
    #[arg(long, env = "LLAMACODER_PROBE_TIMEOUT_MS", default_value_t = 3000)]
    pub probe_timeout_ms: u64,

    /// Model used to generate chat titles
    #[arg(long, env = "LLAMACODER_TITLE_MODEL", default_value = DEFAULT_TITLE_MODEL)]
    pub title_model: String,
}

impl ServerConfig {
    pub fn relay_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }
}
