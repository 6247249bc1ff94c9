//! Per-connection request handling, independent of the socket it runs on.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::identity::{AuthError, IdentityVerifier, VerifiedIdentity};
use crate::services::match_worker::{MatchCommand, Outbound};
use crate::services::protocol::{ClientMessage, ServerMessage};
use crate::services::session_manager::{SessionError, SessionManager, WaitingPlayer};

pub const MAX_NAME_LEN: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("authenticate first")]
    Unauthenticated,

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("name must be 1 to 24 characters")]
    InvalidName,

    #[error("set a name first")]
    NoName,

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct ClientConnection {
    id: String,
    manager: SessionManager,
    verifier: Arc<dyn IdentityVerifier>,
    require_auth: bool,
    outbound: Outbound,
    identity: Option<VerifiedIdentity>,
    name: Option<String>,
}

impl ClientConnection {
    pub fn new(
        manager: SessionManager,
        verifier: Arc<dyn IdentityVerifier>,
        require_auth: bool,
        outbound: Outbound,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            manager,
            verifier,
            require_auth,
            outbound,
            identity: None,
            name: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handles one text frame. Any failure is reported to this client only.
    pub async fn handle_text(&mut self, text: &str) {
        let result = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(message).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            log::debug!("🚫 connection {}: {}", self.id, err);
            let _ = self.outbound.send(ServerMessage::error(err.to_string()));
        }
    }

    pub async fn handle(&mut self, message: ClientMessage) -> Result<(), ConnectionError> {
        match message {
            ClientMessage::Auth { token } => {
                let identity = self.verifier.verify(&token)?;
                log::info!("🔐 connection {} authenticated as {}", self.id, identity.user_id);
                self.identity = Some(identity);
                Ok(())
            }
            ClientMessage::SetName { name } => {
                let name = validate_name(&name)?;
                self.name = Some(name);
                let player = self.waiting_player()?;
                self.manager.enqueue(player).await?;
                Ok(())
            }
            ClientMessage::Rejoin {
                game_id,
                rejoin_token,
                name,
            } => {
                let name = validate_name(&name)?;
                let user_id = self.user_id(&name)?;
                self.name = Some(name);
                let link = self
                    .manager
                    .rejoin(&self.id, &user_id, &game_id, &rejoin_token, self.outbound.clone())
                    .await?;
                log::debug!("🔁 connection {} rejoined {} as {:?}", self.id, link.game_id, link.seat);
                Ok(())
            }
            ClientMessage::FlipCard { index } => self.route(MatchCommand::Flip { index }).await,
            ClientMessage::UsePowerUp {
                power_up_id,
                card_index,
            } => {
                self.route(MatchCommand::UsePowerUp {
                    power_up: power_up_id,
                    target: card_index,
                })
                .await
            }
            ClientMessage::RequestAdvice => self.route(MatchCommand::RequestAdvice).await,
            ClientMessage::PlayAgain => {
                let player = self.waiting_player()?;
                self.manager.play_again(player).await?;
                Ok(())
            }
        }
    }

    /// Releases everything the connection holds.
    pub async fn close(&mut self) {
        self.manager.disconnect(&self.id).await;
    }

    async fn route(&self, command: MatchCommand) -> Result<(), ConnectionError> {
        self.manager.route(&self.id, command).await?;
        Ok(())
    }

    /// Verified identity, or a per-name guest identity when auth is optional.
    fn user_id(&self, name: &str) -> Result<String, ConnectionError> {
        match &self.identity {
            Some(identity) => Ok(identity.user_id.clone()),
            None if self.require_auth => Err(ConnectionError::Unauthenticated),
            None => Ok(format!("guest:{}", name)),
        }
    }

    fn waiting_player(&self) -> Result<WaitingPlayer, ConnectionError> {
        let name = self.name.clone().ok_or(ConnectionError::NoName)?;
        Ok(WaitingPlayer {
            connection_id: self.id.clone(),
            user_id: self.user_id(&name)?,
            name,
            outbound: self.outbound.clone(),
        })
    }
}

fn validate_name(name: &str) -> Result<String, ConnectionError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(ConnectionError::InvalidName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::AnonymousVerifier;
    use crate::game::rules::GameRules;
    use crate::services::result_sink::LogResultSink;
    use crate::services::session_manager::SessionConfig;
    use crate::strategy::registry::HeuristicRegistry;
    use tokio::sync::mpsc;

    fn connection(require_auth: bool) -> (ClientConnection, mpsc::UnboundedReceiver<ServerMessage>) {
        let manager = SessionManager::new(
            GameRules::default(),
            SessionConfig::default(),
            HeuristicRegistry::standard(),
            Arc::new(LogResultSink),
        )
        .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ClientConnection::new(manager, Arc::new(AnonymousVerifier), require_auth, tx),
            rx,
        )
    }

    fn expect_error(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> String {
        match rx.try_recv() {
            Ok(ServerMessage::Error { message }) => message,
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_name("  ann ").unwrap(), "ann");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn test_malformed_frames_are_reported() {
        let (mut connection, mut rx) = connection(false);
        connection.handle_text("{nope").await;
        assert!(expect_error(&mut rx).starts_with("malformed message"));
    }

    #[tokio::test]
    async fn test_auth_required_before_queueing() {
        let (mut connection, mut rx) = connection(true);
        connection.handle_text(r#"{"type":"set_name","name":"ann"}"#).await;
        assert_eq!(expect_error(&mut rx), "authenticate first");

        connection.handle_text(r#"{"type":"auth","token":"ann-device"}"#).await;
        connection.handle_text(r#"{"type":"set_name","name":"ann"}"#).await;
        assert_eq!(rx.recv().await, Some(ServerMessage::WaitingForMatch));
    }

    #[tokio::test]
    async fn test_play_requires_a_match() {
        let (mut connection, mut rx) = connection(false);
        connection.handle_text(r#"{"type":"flip_card","index":0}"#).await;
        assert_eq!(expect_error(&mut rx), "not in a match");

        connection.handle_text(r#"{"type":"play_again"}"#).await;
        assert_eq!(expect_error(&mut rx), "set a name first");
    }
}
