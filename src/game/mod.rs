pub mod board;
pub mod card;
pub mod element;
pub mod match_state;
pub mod player;
pub mod power_up;
pub mod rules;
pub mod snapshot;

pub use board::{new_board, Board, BoardError};
pub use card::{Card, CardState};
pub use element::Element;
pub use match_state::{
    ActionError, ActionOutcome, EndReason, GameResult, HistoryEvent, LoggedAction, MatchEnd,
    MatchState, Phase, PlayerAction, Resolution, Seat,
};
pub use player::{Hand, HandEntry, Player};
pub use power_up::{PowerUpEffect, PowerUpId};
pub use rules::GameRules;
pub use snapshot::{peek_views, snapshot_for, CardView, GameStateView};
