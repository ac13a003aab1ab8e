use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use llamacoder_core::mcp::{McpServer, McpServerInput, McpServersConfig, probe};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ServerIdParams {
    pub id: Option<String>,
}

impl ServerIdParams {
    fn require(self) -> Result<String, AppError> {
        self.id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("Server id is required".into()))
    }
}

#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub online: bool,
}

// GET /api/mcp-servers
pub async fn list_servers(State(state): State<AppState>) -> Result<Json<Vec<McpServer>>, AppError> {
    Ok(Json(state.mcp.list().await?))
}

// POST /api/mcp-servers
pub async fn create_server(
    State(state): State<AppState>,
    Json(input): Json<McpServerInput>,
) -> Result<(StatusCode, Json<McpServer>), AppError> {
    let server = state.mcp.create(input).await?;
    info!(server_id = %server.id, host = %server.host, port = server.port, "registered MCP server");
    Ok((StatusCode::CREATED, Json(server)))
}

// PUT /api/mcp-servers?id=<id>
pub async fn update_server(
    State(state): State<AppState>,
    Query(params): Query<ServerIdParams>,
    Json(input): Json<McpServerInput>,
) -> Result<Json<McpServer>, AppError> {
    let id = params.require()?;
    Ok(Json(state.mcp.update(&id, input).await?))
}

// DELETE /api/mcp-servers?id=<id>
pub async fn delete_server(
    State(state): State<AppState>,
    Query(params): Query<ServerIdParams>,
) -> Result<Json<McpServer>, AppError> {
    let id = params.require()?;
    let removed = state.mcp.delete(&id).await?;
    info!(server_id = %removed.id, "removed MCP server");
    Ok(Json(removed))
}

// GET /api/mcp-servers/config
pub async fn get_config(State(state): State<AppState>) -> Result<Json<McpServersConfig>, AppError> {
    Ok(Json(state.mcp.load_config().await?))
}

// PUT /api/mcp-servers/config
pub async fn put_config(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<McpServersConfig>, AppError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".into()))?;
    let config = McpServersConfig::from_value(value)
        .map_err(|_| AppError::BadRequest("Invalid config".into()))?;
    state.mcp.save_config(&config).await?;
    Ok(Json(config))
}

// GET /api/mcp-servers/status/{id}
pub async fn server_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(server) = state.mcp.get(&id).await? else {
        return Ok((StatusCode::NOT_FOUND, Json(ServerStatus { online: false })).into_response());
    };
    let online = probe(&server.host, server.port, state.probe_timeout).await;
    Ok(Json(ServerStatus { online }).into_response())
}
