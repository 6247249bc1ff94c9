use serde::{Deserialize, Serialize};

use crate::game::element::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    Hidden,
    Revealed,
    Matched,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub index: usize,
    pub pair_id: usize,
    pub state: CardState,
    /// Only set while the card is face up (revealed or matched) and belongs to a normal pair.
    pub element: Option<Element>,
    /// Whether this card has been face up since the last shuffle.
    pub seen: bool,
}

impl Card {
    pub fn new(index: usize, pair_id: usize) -> Self {
        Self {
            index,
            pair_id,
            state: CardState::Hidden,
            element: None,
            seen: false,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.state == CardState::Hidden
    }

    /// Still on the board and not yet claimed.
    pub fn in_play(&self) -> bool {
        matches!(self.state, CardState::Hidden | CardState::Revealed)
    }
}
