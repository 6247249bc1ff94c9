//! Per-viewer `game_state` payload. Face-down cards never carry their
//! identity; private peeks are built separately by [`peek_views`] and travel
//! in their own message, to the active viewer only.

use serde::Serialize;

use crate::game::card::{Card, CardState};
use crate::game::element::{symbol_for_normal_pair, Element};
use crate::game::match_state::{MatchState, Phase, Seat};
use crate::game::player::Player;
use crate::game::power_up::PowerUpId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub index: usize,
    pub state: CardState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_up: Option<PowerUpId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandView {
    pub power_up_id: PowerUpId,
    pub count: u32,
    pub usable_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub name: String,
    pub score: u32,
    pub combo_streak: u32,
    pub shield: u32,
    pub hand: Vec<HandView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game_id: String,
    pub board_rows: usize,
    pub board_cols: usize,
    pub cards: Vec<CardView>,
    pub phase: Phase,
    pub your_turn: bool,
    pub flipped: Vec<usize>,
    pub you: PlayerView,
    pub opponent: PlayerView,
    pub pairs_remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_deadline_unix_ms: Option<i64>,
    pub highlights: Vec<usize>,
    pub finished: bool,
}

fn face_up_view(state: &MatchState, card: &Card) -> CardView {
    let board = state.board();
    let arcana = board.is_arcana(card.pair_id);
    CardView {
        index: card.index,
        state: card.state,
        pair_id: Some(card.pair_id),
        element: board.element_of_pair(card.pair_id),
        symbol: (!arcana).then(|| symbol_for_normal_pair(card.pair_id, board.arcana_pairs()).name),
        power_up: board.power_up_for_pair(card.pair_id),
    }
}

/// Face-up view of a card whatever its current state, for announcing the two
/// cards of a resolved turn after they have been turned back down.
pub fn reveal_view(state: &MatchState, index: usize) -> Option<CardView> {
    state.board().card(index).map(|card| face_up_view(state, card))
}

fn card_view(state: &MatchState, card: &Card) -> CardView {
    match card.state {
        CardState::Revealed | CardState::Matched => face_up_view(state, card),
        CardState::Hidden | CardState::Removed => CardView {
            index: card.index,
            state: card.state,
            pair_id: None,
            element: None,
            symbol: None,
            power_up: None,
        },
    }
}

fn player_view(player: &Player) -> PlayerView {
    PlayerView {
        name: player.name.clone(),
        score: player.score,
        combo_streak: player.combo_streak,
        shield: player.shield,
        hand: player
            .hand
            .iter()
            .map(|(power_up_id, entry)| HandView {
                power_up_id,
                count: entry.count,
                usable_count: entry.usable_count,
            })
            .collect(),
    }
}

/// Identities of the cards `viewer` peeked at this turn that are still face
/// down. Empty for anyone but the active player.
pub fn peek_views(state: &MatchState, viewer: Seat) -> Vec<CardView> {
    if state.active_seat() != viewer || state.is_finished() {
        return Vec::new();
    }
    let board = state.board();
    state
        .effects()
        .peeks
        .iter()
        .filter_map(|&index| board.card(index))
        .filter(|card| card.is_hidden())
        .map(|card| face_up_view(state, card))
        .collect()
}

pub fn snapshot_for(
    state: &MatchState,
    viewer: Seat,
    turn_deadline_unix_ms: Option<i64>,
) -> GameStateView {
    let board = state.board();
    let your_turn = state.active_seat() == viewer && !state.is_finished();

    let highlights = if your_turn {
        state.effects().highlights.iter().copied().collect()
    } else {
        Vec::new()
    };

    GameStateView {
        game_id: state.id().to_string(),
        board_rows: board.rows(),
        board_cols: board.cols(),
        cards: board.cards().iter().map(|card| card_view(state, card)).collect(),
        phase: state.turn().phase,
        your_turn,
        flipped: state.turn().flipped.clone(),
        you: player_view(state.player(viewer)),
        opponent: player_view(state.player(viewer.opponent())),
        pairs_remaining: board.remaining_pairs(),
        turn_deadline_unix_ms,
        highlights,
        finished: state.is_finished(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::Board;
    use crate::game::match_state::PlayerAction;
    use crate::game::rules::GameRules;

    fn state() -> MatchState {
        let board = Board::from_layout(
            2,
            4,
            vec![PowerUpId::Scry, PowerUpId::Chaos],
            vec![0, 2, 1, 3, 0, 2, 1, 3],
        )
        .unwrap();
        let rules = GameRules { rows: 2, cols: 4, arcana_pairs: 2, ..GameRules::default() };
        MatchState::with_board("view", ["a".into(), "b".into()], Seat::First, rules, board, 5)
    }

    #[test]
    fn test_hidden_cards_stay_anonymous() {
        let mut state = state();
        state.apply(Seat::First, PlayerAction::Flip { index: 1 }).unwrap();

        for viewer in Seat::BOTH {
            let view = snapshot_for(&state, viewer, None);
            let json = serde_json::to_value(&view).unwrap();
            for card in json["cards"].as_array().unwrap() {
                if card["state"] == "hidden" {
                    assert!(card.get("pairId").is_none());
                    assert!(card.get("element").is_none());
                }
            }
            assert_eq!(json["cards"][1]["pairId"], 2);
            assert_eq!(json["cards"][1]["element"], "fire");
            assert_eq!(json["cards"][1]["symbol"], "ember");
        }
    }

    fn scry_on(state: &mut MatchState, target: usize) {
        // Alice wins scry and a normal pair, then both players miss once.
        for (seat, a, b) in [
            (Seat::First, 0, 4),
            (Seat::First, 1, 5),
            (Seat::First, 2, 3),
            (Seat::Second, 2, 3),
        ] {
            state.apply(seat, PlayerAction::Flip { index: a }).unwrap();
            state.apply(seat, PlayerAction::Flip { index: b }).unwrap();
        }
        state
            .apply(
                Seat::First,
                PlayerAction::UsePowerUp { power_up: PowerUpId::Scry, target: Some(target) },
            )
            .unwrap();
    }

    #[test]
    fn test_scry_stays_out_of_game_state() {
        let mut state = state();
        scry_on(&mut state, 2);

        for viewer in Seat::BOTH {
            let json = serde_json::to_value(snapshot_for(&state, viewer, None)).unwrap();
            assert!(json.get("peeks").is_none());
            for card in json["cards"].as_array().unwrap() {
                if card["state"] == "hidden" {
                    assert!(card.get("pairId").is_none());
                    assert!(card.get("element").is_none());
                    assert!(card.get("powerUp").is_none());
                }
            }
        }

        let peeked: Vec<(usize, Option<usize>)> = peek_views(&state, Seat::First)
            .iter()
            .map(|view| (view.index, view.pair_id))
            .collect();
        assert_eq!(peeked, vec![(2, Some(1)), (3, Some(3)), (6, Some(1)), (7, Some(3))]);
        assert!(peek_views(&state, Seat::Second).is_empty());
    }

    #[test]
    fn test_turn_flag_and_players_are_per_viewer() {
        let state = state();
        let first = snapshot_for(&state, Seat::First, Some(1_000));
        let second = snapshot_for(&state, Seat::Second, Some(1_000));
        assert!(first.your_turn);
        assert!(!second.your_turn);
        assert_eq!(first.you.name, "a");
        assert_eq!(second.you.name, "b");
        assert_eq!(first.pairs_remaining, 4);
        assert_eq!(first.turn_deadline_unix_ms, Some(1_000));
    }
}
