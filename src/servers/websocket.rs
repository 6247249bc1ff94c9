use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::auth::identity::IdentityVerifier;
use crate::services::connection::ClientConnection;
use crate::services::protocol::ServerMessage;
use crate::services::session_manager::SessionManager;
use crate::ArcanaError;

#[derive(Debug, Clone)]
pub struct GameSocketConfig {
    pub port: u16,
    pub host: String,
    /// Reject `set_name`/`rejoin` until the client has sent a valid `auth`.
    pub require_auth: bool,
}

impl Default for GameSocketConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            require_auth: false,
        }
    }
}

/// Accepts websocket clients and drives one `ClientConnection` per socket.
pub struct GameSocketServer {
    config: GameSocketConfig,
    manager: SessionManager,
    verifier: Arc<dyn IdentityVerifier>,
}

impl GameSocketServer {
    pub fn new(
        config: GameSocketConfig,
        manager: SessionManager,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            config,
            manager,
            verifier,
        }
    }

    pub async fn start(&self) -> Result<(), ArcanaError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ArcanaError::Server(format!("invalid game address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;
        log::info!("🔌 Game server listening on ws://{}", addr);
        self.serve(listener).await
    }

    /// Accept loop on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ArcanaError> {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error!("❌ Failed to accept connection: {}", e);
                    continue;
                }
            };
            tokio::spawn(handle_socket(
                stream,
                peer,
                self.manager.clone(),
                self.verifier.clone(),
                self.config.require_auth,
            ));
        }
    }
}

async fn handle_socket(
    stream: TcpStream,
    peer: SocketAddr,
    manager: SessionManager,
    verifier: Arc<dyn IdentityVerifier>,
    require_auth: bool,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            log::warn!("⚠️ WebSocket handshake with {} failed: {:?}", peer, e);
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();
    let (outbound, mut queue) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    log::error!("❌ Failed to encode {:?}: {}", message, e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::text(text)).await {
                log::warn!("⚠️ WebSocket send to {} failed: {:?}", peer, e);
                break;
            }
        }
        let _ = write.close().await;
    });

    let mut connection = ClientConnection::new(manager, verifier, require_auth, outbound);
    log::debug!("👋 {} connected as {}", peer, connection.id());

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => connection.handle_text(text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("⚠️ WebSocket read from {} failed: {:?}", peer, e);
                break;
            }
        }
    }

    connection.close().await;
    log::debug!("👋 {} ({}) left", peer, connection.id());
    writer.abort();
}
