//! File-backed registry of MCP server entries and the raw `mcpServers`
//! config document, plus a TCP liveness probe.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::chat::new_id;

pub const SERVERS_FILE: &str = "mcp-servers.json";
pub const CONFIG_FILE: &str = "mcp-config.json";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("invalid MCP server: {0}")]
    Validation(String),
    #[error("MCP server not found: {0}")]
    NotFound(String),
    #[error("invalid MCP config: {0}")]
    InvalidConfig(String),
    #[error("MCP store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP store contains malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Form input for creating or updating a server entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct McpServerInput {
    pub name: String,
    pub host: String,
    pub port: u32,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl McpServerInput {
    fn validate(self, id: String) -> Result<McpServer, McpError> {
        let name = self.name.trim();
        let host = self.host.trim();
        if name.is_empty() || host.is_empty() {
            return Err(McpError::Validation(
                "name, host, and port are required".into(),
            ));
        }
        let port = u16::try_from(self.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| McpError::Validation(format!("port out of range: {}", self.port)))?;
        Ok(McpServer {
            id,
            name: name.to_string(),
            host: host.to_string(),
            port,
            username: non_blank(self.username),
            password: non_blank(self.password),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `{ "mcpServers": { "<name>": { ... } } }` document edited as raw JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McpServersConfig {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: serde_json::Map<String, serde_json::Value>,
}

impl Default for McpServersConfig {
    fn default() -> Self {
        Self {
            mcp_servers: serde_json::Map::new(),
        }
    }
}

impl McpServersConfig {
    /// Accepts only documents whose `mcpServers` member is an object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, McpError> {
        match value.get("mcpServers") {
            Some(serde_json::Value::Object(_)) => serde_json::from_value(value)
                .map_err(|e| McpError::InvalidConfig(e.to_string())),
            _ => Err(McpError::InvalidConfig(
                "`mcpServers` must be an object".into(),
            )),
        }
    }
}

/// JSON files under a data directory. Writes are serialized through a lock.
pub struct McpServerRegistry {
    servers_path: PathBuf,
    config_path: PathBuf,
    lock: Mutex<()>,
}

impl McpServerRegistry {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            servers_path: data_dir.join(SERVERS_FILE),
            config_path: data_dir.join(CONFIG_FILE),
            lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Result<Vec<McpServer>, McpError> {
        let _guard = self.lock.lock().await;
        self.read_servers().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<McpServer>, McpError> {
        Ok(self.list().await?.into_iter().find(|s| s.id == id))
    }

    pub async fn create(&self, input: McpServerInput) -> Result<McpServer, McpError> {
        let server = input.validate(new_id())?;
        let _guard = self.lock.lock().await;
        let mut servers = self.read_servers().await?;
        servers.push(server.clone());
        self.write_servers(&servers).await?;
        debug!(server_id = %server.id, name = %server.name, "created MCP server");
        Ok(server)
    }

    pub async fn update(&self, id: &str, input: McpServerInput) -> Result<McpServer, McpError> {
        let server = input.validate(id.to_string())?;
        let _guard = self.lock.lock().await;
        let mut servers = self.read_servers().await?;
        let slot = servers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| McpError::NotFound(id.to_string()))?;
        *slot = server.clone();
        self.write_servers(&servers).await?;
        Ok(server)
    }

    pub async fn delete(&self, id: &str) -> Result<McpServer, McpError> {
        let _guard = self.lock.lock().await;
        let mut servers = self.read_servers().await?;
        let index = servers
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| McpError::NotFound(id.to_string()))?;
        let removed = servers.remove(index);
        self.write_servers(&servers).await?;
        Ok(removed)
    }

    pub async fn load_config(&self) -> Result<McpServersConfig, McpError> {
        let _guard = self.lock.lock().await;
        let default = serde_json::to_string_pretty(&McpServersConfig::default())
            .map_err(|source| self.json_error(&self.config_path, source))?;
        let raw = ensure_file(&self.config_path, &default).await?;
        serde_json::from_str(&raw).map_err(|source| self.json_error(&self.config_path, source))
    }

    pub async fn save_config(&self, config: &McpServersConfig) -> Result<(), McpError> {
        let _guard = self.lock.lock().await;
        let raw = serde_json::to_string_pretty(config)
            .map_err(|source| self.json_error(&self.config_path, source))?;
        write_file(&self.config_path, &raw).await
    }

    async fn read_servers(&self) -> Result<Vec<McpServer>, McpError> {
        let raw = ensure_file(&self.servers_path, "[]").await?;
        serde_json::from_str(&raw).map_err(|source| self.json_error(&self.servers_path, source))
    }

    async fn write_servers(&self, servers: &[McpServer]) -> Result<(), McpError> {
        let raw = serde_json::to_string_pretty(servers)
            .map_err(|source| self.json_error(&self.servers_path, source))?;
        write_file(&self.servers_path, &raw).await
    }

    fn json_error(&self, path: &Path, source: serde_json::Error) -> McpError {
        McpError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

async fn ensure_file(path: &Path, default: &str) -> Result<String, McpError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            write_file(path, default).await?;
            Ok(default.to_string())
        }
        Err(source) => Err(McpError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn write_file(path: &Path, raw: &str) -> Result<(), McpError> {
    let io_err = |source| McpError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, raw).await.map_err(io_err)
}

/// Returns whether a TCP connection to `host:port` succeeds within `timeout`.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "MCP server probe failed");
            false
        }
        Err(_) => {
            warn!(host, port, timeout_ms = timeout.as_millis() as u64, "MCP server probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, port: u32) -> McpServerInput {
        McpServerInput {
            name: name.into(),
            host: "127.0.0.1".into(),
            port,
            username: Some("  ".into()),
            password: None,
        }
    }

    #[tokio::test]
    async fn first_access_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = McpServerRegistry::new(dir.path().join("data"));
        assert!(registry.list().await.unwrap().is_empty());
        let raw = std::fs::read_to_string(dir.path().join("data").join(SERVERS_FILE)).unwrap();
        assert_eq!(raw, "[]");
    }

    #[tokio::test]
    async fn crud_round_trip_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let registry = McpServerRegistry::new(dir.path());
        let created = registry.create(input(" files ", 8080)).await.unwrap();
        assert_eq!(created.name, "files");
        assert_eq!(created.username, None);

        let reopened = McpServerRegistry::new(dir.path());
        assert_eq!(reopened.list().await.unwrap(), vec![created.clone()]);

        let updated = reopened
            .update(&created.id, input("renamed", 9090))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(reopened.get(&created.id).await.unwrap().unwrap().port, 9090);

        reopened.delete(&created.id).await.unwrap();
        assert!(reopened.list().await.unwrap().is_empty());
        assert!(matches!(
            reopened.delete(&created.id).await,
            Err(McpError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn validation_rejects_blank_fields_and_bad_ports() {
        let dir = tempfile::tempdir().unwrap();
        let registry = McpServerRegistry::new(dir.path());
        assert!(matches!(
            registry.create(input("", 80)).await,
            Err(McpError::Validation(_))
        ));
        assert!(matches!(
            registry.create(input("x", 0)).await,
            Err(McpError::Validation(_))
        ));
        assert!(matches!(
            registry.create(input("x", 70_000)).await,
            Err(McpError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn config_defaults_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let registry = McpServerRegistry::new(dir.path());
        assert_eq!(registry.load_config().await.unwrap(), McpServersConfig::default());

        let config = McpServersConfig::from_value(serde_json::json!({
            "mcpServers": {"search": {"url": "https://example.com/mcp"}}
        }))
        .unwrap();
        registry.save_config(&config).await.unwrap();
        assert_eq!(registry.load_config().await.unwrap(), config);
    }

    #[test]
    fn config_requires_object_member() {
        for bad in [
            serde_json::json!({}),
            serde_json::json!({"mcpServers": []}),
            serde_json::json!({"mcpServers": "x"}),
        ] {
            assert!(matches!(
                McpServersConfig::from_value(bad),
                Err(McpError::InvalidConfig(_))
            ));
        }
    }

    #[tokio::test]
    async fn probe_detects_listening_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(probe("127.0.0.1", port, DEFAULT_PROBE_TIMEOUT).await);
        drop(listener);
        assert!(!probe("127.0.0.1", port, Duration::from_millis(500)).await);
    }
}
