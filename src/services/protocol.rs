//! JSON envelopes exchanged with clients, keyed by a `type` field.

use serde::{Deserialize, Serialize};

use crate::game::match_state::{EndReason, GameResult};
use crate::game::power_up::PowerUpId;
use crate::game::snapshot::{CardView, GameStateView};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Auth {
        token: String,
    },
    SetName {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    Rejoin {
        game_id: String,
        rejoin_token: String,
        name: String,
    },
    FlipCard {
        index: usize,
    },
    #[serde(rename_all = "camelCase")]
    UsePowerUp {
        power_up_id: PowerUpId,
        card_index: Option<usize>,
    },
    PlayAgain,
    RequestAdvice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreLine {
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Error {
        message: String,
    },
    WaitingForMatch,
    #[serde(rename_all = "camelCase")]
    MatchFound {
        game_id: String,
        rejoin_token: String,
        opponent_name: String,
        board_rows: usize,
        board_cols: usize,
        your_turn: bool,
    },
    GameState(GameStateView),
    GameOver {
        result: GameResult,
        you: ScoreLine,
        opponent: ScoreLine,
        reason: EndReason,
    },
    OpponentDisconnected,
    #[serde(rename_all = "camelCase")]
    OpponentReconnecting {
        reconnection_deadline_unix_ms: i64,
    },
    OpponentReconnected,
    TurnTimeout,
    /// The two cards of a finished flip, shown to both players.
    #[serde(rename_all = "camelCase")]
    FlipResult {
        by_you: bool,
        cards: Vec<CardView>,
        matched: bool,
        points: u32,
    },
    #[serde(rename_all = "camelCase")]
    PowerUpUsed {
        by_you: bool,
        power_up_id: PowerUpId,
        #[serde(skip_serializing_if = "Option::is_none")]
        card_index: Option<usize>,
    },
    /// Cards revealed by a scry, to its user only.
    PeekResult {
        cards: Vec<CardView>,
    },
    #[serde(rename_all = "camelCase")]
    PowerUpAdvice {
        power_up_id: Option<PowerUpId>,
        card_index: Option<usize>,
        expected_value: f64,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
