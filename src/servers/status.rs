use axum::{extract::State, response::Json as ResponseJson, routing::get, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::services::session_manager::SessionManager;
use crate::ArcanaError;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub active_matches: usize,
    pub waiting_players: usize,
}

// Configuration for the status server
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub port: u16,
    pub host: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Read-only HTTP view of the session manager.
pub struct StatusServer {
    config: StatusConfig,
    manager: SessionManager,
}

impl StatusServer {
    pub fn new(config: StatusConfig, manager: SessionManager) -> Self {
        Self { config, manager }
    }

    pub async fn start(&self) -> Result<(), ArcanaError> {
        let app = self.create_router();
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ArcanaError::Server(format!("invalid status address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;

        log::info!(
            "🌐 Status server starting on http://localhost:{}/api/status",
            self.config.port
        );

        axum::serve(listener, app).await?;
        Ok(())
    }

    fn create_router(&self) -> Router {
        Router::new()
            .route("/api/status", get(api_status))
            .with_state(self.manager.clone())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
    }
}

async fn api_status(State(manager): State<SessionManager>) -> ResponseJson<StatusResponse> {
    ResponseJson(StatusResponse {
        status: "ready".to_string(),
        version: crate::VERSION.to_string(),
        active_matches: manager.active_matches().await,
        waiting_players: manager.waiting_players().await,
    })
}
