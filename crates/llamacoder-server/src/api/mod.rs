//! HTTP routes.

pub mod chats;
pub mod completions;
pub mod mcp_servers;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/chats",
            get(chats::list_chats)
                .post(chats::create_chat)
                .delete(chats::delete_all_chats),
        )
        .route(
            "/api/chats/{id}",
            get(chats::get_chat)
                .put(chats::toggle_chat_flag)
                .post(chats::add_chat_tag)
                .delete(chats::delete_chat_or_tag),
        )
        .route("/api/chats/{id}/messages", post(chats::create_message))
        .route(
            "/api/get-next-completion-stream-promise",
            post(completions::stream_completion),
        )
        .route(
            "/api/mcp-servers",
            get(mcp_servers::list_servers)
                .post(mcp_servers::create_server)
                .put(mcp_servers::update_server)
                .delete(mcp_servers::delete_server),
        )
        .route(
            "/api/mcp-servers/config",
            get(mcp_servers::get_config).put(mcp_servers::put_config),
        )
        .route("/api/mcp-servers/status/{id}", get(mcp_servers::server_status))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}
