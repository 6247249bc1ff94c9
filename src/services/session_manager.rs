// src/services/session_manager.rs - matchmaking queue, match registry and connection routing

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{oneshot, RwLock};
use uuid::Uuid;

use crate::game::board::{new_board, BoardError};
use crate::game::match_state::{MatchState, Seat};
use crate::game::rules::GameRules;
use crate::services::match_worker::{
    spawn_match, MatchCommand, MatchEvent, Outbound, SeatHandle, WorkerContext,
};
use crate::services::protocol::ServerMessage;
use crate::services::result_sink::ResultSink;
use crate::strategy::registry::HeuristicRegistry;

// ============================================================================
// CONFIGURATION & ERRORS
// ============================================================================

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time the active player has to finish a turn.
    pub turn_timeout: Duration,
    /// Time a disconnected player has to rejoin before forfeiting.
    pub reconnect_grace: Duration,
    /// How long a finished match stays addressable.
    pub finished_retention: Duration,
    /// Deal every match from this seed instead of a random one.
    pub deal_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(30),
            reconnect_grace: Duration::from_secs(60),
            finished_retention: Duration::from_secs(30),
            deal_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejoinError {
    #[error("game not found")]
    GameNotFound,

    #[error("game already finished")]
    GameFinished,

    #[error("no active game for this player")]
    NoActiveGame,

    #[error("player is not disconnected")]
    NotDisconnected,

    #[error("invalid rejoin token")]
    InvalidToken,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("already in a match")]
    AlreadyInMatch,

    #[error("already waiting for a match")]
    AlreadyWaiting,

    #[error("not in a match")]
    NotInMatch,

    #[error("match is no longer running")]
    MatchClosed,

    #[error("could not issue a rejoin token")]
    Credentials,

    #[error(transparent)]
    Rejoin(#[from] RejoinError),

    #[error("could not deal a board: {0}")]
    Board(#[from] BoardError),
}

// ============================================================================
// STORE STATE
// ============================================================================

/// A connection waiting to be paired.
pub struct WaitingPlayer {
    pub connection_id: String,
    pub user_id: String,
    pub name: String,
    pub outbound: Outbound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLink {
    pub game_id: String,
    pub seat: Seat,
}

pub(crate) struct MatchEntry {
    events: tokio::sync::mpsc::UnboundedSender<MatchEvent>,
    players: [String; 2],
    finished: bool,
}

#[derive(Default)]
pub(crate) struct SessionStoreState {
    waiting: VecDeque<WaitingPlayer>,
    matches: HashMap<String, MatchEntry>,
    /// user identity -> live game id
    active_games: HashMap<String, String>,
    /// connection id -> seat in a match
    links: HashMap<String, MatchLink>,
}

pub(crate) async fn mark_match_finished(store: &Arc<RwLock<SessionStoreState>>, game_id: &str) {
    let mut state = store.write().await;
    let players = match state.matches.get_mut(game_id) {
        Some(entry) => {
            entry.finished = true;
            entry.players.clone()
        }
        None => return,
    };
    for user in players {
        if state.active_games.get(&user).map(String::as_str) == Some(game_id) {
            state.active_games.remove(&user);
        }
    }
}

pub(crate) async fn remove_match(store: &Arc<RwLock<SessionStoreState>>, game_id: &str) {
    let mut state = store.write().await;
    state.matches.remove(game_id);
    state.links.retain(|_, link| link.game_id != game_id);
    state.active_games.retain(|_, game| game != game_id);
}

fn generate_rejoin_token() -> Result<String, SessionError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|_| SessionError::Credentials)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

// ============================================================================
// SESSION MANAGER
// ============================================================================

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<RwLock<SessionStoreState>>,
    rules: GameRules,
    ctx: WorkerContext,
}

impl SessionManager {
    /// Fails when `rules` cannot produce a board.
    pub fn new(
        rules: GameRules,
        config: SessionConfig,
        registry: HeuristicRegistry,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self, BoardError> {
        new_board(
            rules.rows,
            rules.cols,
            rules.arcana_pairs,
            &rules.power_up_pool,
            &mut StdRng::seed_from_u64(0),
        )?;
        let store = Arc::new(RwLock::new(SessionStoreState::default()));
        Ok(Self {
            store: store.clone(),
            rules,
            ctx: WorkerContext {
                config,
                registry: Arc::new(registry),
                sink,
                store,
            },
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    /// Pairs `player` with the longest-waiting player of another identity, or
    /// queues it.
    pub async fn enqueue(&self, player: WaitingPlayer) -> Result<(), SessionError> {
        let mut state = self.store.write().await;
        if state.links.contains_key(&player.connection_id)
            || state.active_games.contains_key(&player.user_id)
        {
            return Err(SessionError::AlreadyInMatch);
        }
        if state
            .waiting
            .iter()
            .any(|waiting| waiting.connection_id == player.connection_id)
        {
            return Err(SessionError::AlreadyWaiting);
        }

        let opponent_at = state
            .waiting
            .iter()
            .position(|waiting| waiting.user_id != player.user_id);
        let opponent = opponent_at.and_then(|at| state.waiting.remove(at));

        let Some(opponent) = opponent else {
            log::info!("⏳ {} is waiting for an opponent", player.name);
            let _ = player.outbound.send(ServerMessage::WaitingForMatch);
            state.waiting.push_back(player);
            return Ok(());
        };

        let opponent_outbound = opponent.outbound.clone();
        match self.start_match(&mut state, opponent, player) {
            Ok(_) => Ok(()),
            Err(err) => {
                log::error!("❌ could not start a match: {}", err);
                let _ = opponent_outbound.send(ServerMessage::error(err.to_string()));
                Err(err)
            }
        }
    }

    fn start_match(
        &self,
        state: &mut SessionStoreState,
        waiting: WaitingPlayer,
        joining: WaitingPlayer,
    ) -> Result<String, SessionError> {
        let game_id = Uuid::new_v4().to_string();
        let first_seat = if rand::random::<bool>() {
            Seat::First
        } else {
            Seat::Second
        };
        let match_state = MatchState::new(
            game_id.clone(),
            [waiting.name.clone(), joining.name.clone()],
            first_seat,
            self.rules.clone(),
            self.ctx.config.deal_seed.unwrap_or_else(rand::random),
        )?;
        let tokens = [generate_rejoin_token()?, generate_rejoin_token()?];

        let players = [waiting.user_id.clone(), joining.user_id.clone()];
        let connections = [waiting.connection_id.clone(), joining.connection_id.clone()];
        let [first_token, second_token] = tokens;
        let events = spawn_match(
            match_state,
            [
                SeatHandle { player: waiting, rejoin_token: first_token },
                SeatHandle { player: joining, rejoin_token: second_token },
            ],
            self.ctx.clone(),
        );

        for (seat, connection_id) in Seat::BOTH.into_iter().zip(connections) {
            state.links.insert(
                connection_id,
                MatchLink {
                    game_id: game_id.clone(),
                    seat,
                },
            );
        }
        for user in &players {
            state.active_games.insert(user.clone(), game_id.clone());
        }
        state.matches.insert(
            game_id.clone(),
            MatchEntry {
                events,
                players,
                finished: false,
            },
        );
        Ok(game_id)
    }

    /// Reattaches a new connection to its seat in a live match.
    pub async fn rejoin(
        &self,
        connection_id: &str,
        user_id: &str,
        game_id: &str,
        rejoin_token: &str,
        outbound: Outbound,
    ) -> Result<MatchLink, SessionError> {
        let events = {
            let state = self.store.read().await;
            if state.links.contains_key(connection_id) {
                return Err(SessionError::AlreadyInMatch);
            }
            let entry = state.matches.get(game_id).ok_or(RejoinError::GameNotFound)?;
            if entry.finished {
                return Err(RejoinError::GameFinished.into());
            }
            if !entry.players.iter().any(|player| player == user_id) {
                return Err(RejoinError::NoActiveGame.into());
            }
            entry.events.clone()
        };

        let (reply, response) = oneshot::channel();
        events
            .send(MatchEvent::Rejoin {
                user_id: user_id.to_string(),
                rejoin_token: rejoin_token.to_string(),
                connection_id: connection_id.to_string(),
                outbound,
                reply,
            })
            .map_err(|_| RejoinError::GameNotFound)?;
        let seat = response.await.map_err(|_| RejoinError::GameNotFound)??;

        let link = MatchLink {
            game_id: game_id.to_string(),
            seat,
        };
        let mut state = self.store.write().await;
        state
            .waiting
            .retain(|waiting| waiting.connection_id != connection_id);
        state.links.insert(connection_id.to_string(), link.clone());
        Ok(link)
    }

    /// Forwards a play request to the connection's match.
    pub async fn route(&self, connection_id: &str, command: MatchCommand) -> Result<(), SessionError> {
        let state = self.store.read().await;
        let link = state
            .links
            .get(connection_id)
            .ok_or(SessionError::NotInMatch)?;
        let entry = state
            .matches
            .get(&link.game_id)
            .ok_or(SessionError::NotInMatch)?;
        entry
            .events
            .send(MatchEvent::Command {
                seat: link.seat,
                command,
            })
            .map_err(|_| SessionError::MatchClosed)
    }

    /// Leaves a finished match, if any, and queues for a new one.
    pub async fn play_again(&self, player: WaitingPlayer) -> Result<(), SessionError> {
        {
            let mut state = self.store.write().await;
            if let Some(link) = state.links.get(&player.connection_id).cloned() {
                if let Some(entry) = state.matches.get(&link.game_id) {
                    if !entry.finished {
                        return Err(SessionError::AlreadyInMatch);
                    }
                    let _ = entry.events.send(MatchEvent::Acknowledge { seat: link.seat });
                }
                state.links.remove(&player.connection_id);
            }
        }
        self.enqueue(player).await
    }

    pub async fn disconnect(&self, connection_id: &str) {
        let mut state = self.store.write().await;
        state
            .waiting
            .retain(|waiting| waiting.connection_id != connection_id);
        if let Some(link) = state.links.remove(connection_id) {
            if let Some(entry) = state.matches.get(&link.game_id) {
                let _ = entry.events.send(MatchEvent::Disconnected {
                    seat: link.seat,
                    connection_id: connection_id.to_string(),
                });
            }
        }
    }

    pub async fn link_for(&self, connection_id: &str) -> Option<MatchLink> {
        self.store.read().await.links.get(connection_id).cloned()
    }

    pub async fn waiting_players(&self) -> usize {
        self.store.read().await.waiting.len()
    }

    pub async fn active_matches(&self) -> usize {
        self.store
            .read()
            .await
            .matches
            .values()
            .filter(|entry| !entry.finished)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::result_sink::LogResultSink;
    use tokio::sync::mpsc;

    fn manager() -> SessionManager {
        SessionManager::new(
            GameRules::default(),
            SessionConfig::default(),
            HeuristicRegistry::standard(),
            Arc::new(LogResultSink),
        )
        .unwrap()
    }

    fn player(
        connection: &str,
        user: &str,
    ) -> (WaitingPlayer, mpsc::UnboundedReceiver<ServerMessage>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (
            WaitingPlayer {
                connection_id: connection.to_string(),
                user_id: user.to_string(),
                name: user.to_string(),
                outbound,
            },
            rx,
        )
    }

    #[test]
    fn test_rejects_impossible_rules() {
        let rules = GameRules {
            rows: 3,
            cols: 3,
            ..GameRules::default()
        };
        let result = SessionManager::new(
            rules,
            SessionConfig::default(),
            HeuristicRegistry::standard(),
            Arc::new(LogResultSink),
        );
        assert!(matches!(result, Err(BoardError::OddCardCount { .. })));
    }

    #[test]
    fn test_rejoin_tokens_are_unique() {
        let first = generate_rejoin_token().unwrap();
        let second = generate_rejoin_token().unwrap();
        assert_eq!(first.len(), 43);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_first_player_waits() {
        let manager = manager();
        let (alice, mut rx) = player("c1", "alice");
        manager.enqueue(alice).await.unwrap();

        assert_eq!(rx.recv().await, Some(ServerMessage::WaitingForMatch));
        assert_eq!(manager.waiting_players().await, 1);
        assert_eq!(manager.active_matches().await, 0);

        let (again, _rx) = player("c1", "alice");
        assert!(matches!(
            manager.enqueue(again).await,
            Err(SessionError::AlreadyWaiting)
        ));
    }

    #[tokio::test]
    async fn test_same_identity_is_not_paired_with_itself() {
        let manager = manager();
        let (first, _rx1) = player("c1", "alice");
        let (second, _rx2) = player("c2", "alice");
        manager.enqueue(first).await.unwrap();
        manager.enqueue(second).await.unwrap();

        assert_eq!(manager.waiting_players().await, 2);
        assert_eq!(manager.active_matches().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_leaves_the_queue() {
        let manager = manager();
        let (alice, _rx) = player("c1", "alice");
        manager.enqueue(alice).await.unwrap();
        manager.disconnect("c1").await;
        assert_eq!(manager.waiting_players().await, 0);
    }

    #[tokio::test]
    async fn test_route_requires_a_match() {
        let manager = manager();
        let result = manager.route("nobody", MatchCommand::Flip { index: 0 }).await;
        assert!(matches!(result, Err(SessionError::NotInMatch)));
    }

    #[tokio::test]
    async fn test_unknown_game_cannot_be_rejoined() {
        let manager = manager();
        let (outbound, _rx) = mpsc::unbounded_channel();
        let result = manager.rejoin("c9", "alice", "missing", "token", outbound).await;
        assert!(matches!(
            result,
            Err(SessionError::Rejoin(RejoinError::GameNotFound))
        ));
    }
}
