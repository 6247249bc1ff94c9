//! Whole matches played against the engine, then rebuilt from their action log.

use arcana_pairs::game::{
    ActionError, ActionOutcome, GameResult, GameRules, MatchState, PlayerAction, PowerUpId, Seat,
};
use arcana_pairs::strategy::{advise, HeuristicRegistry};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SEED: u64 = 2024;

fn rules() -> GameRules {
    GameRules {
        rows: 4,
        cols: 4,
        arcana_pairs: 6,
        ..GameRules::default()
    }
}

fn names() -> [String; 2] {
    ["alice".to_string(), "bob".to_string()]
}

fn flip(state: &mut MatchState, seat: Seat, index: usize) -> ActionOutcome {
    state.apply(seat, PlayerAction::Flip { index }).unwrap()
}

/// Two hidden cards that are not a pair.
fn miss(state: &MatchState) -> (usize, usize) {
    let hidden = state.board().hidden_indices();
    let first = hidden[0];
    let partner = state.board().partner_of(first).unwrap();
    let second = *hidden.iter().find(|&&index| index != first && index != partner).unwrap();
    (first, second)
}

/// Cheapest-to-set-up arcana pair: one whose power-up costs a single match.
fn cheap_arcana_pair(state: &MatchState) -> (usize, usize, PowerUpId) {
    let board = state.board();
    board
        .hidden_indices()
        .into_iter()
        .find_map(|index| {
            let pair_id = board.card(index)?.pair_id;
            let power_up = board.power_up_for_pair(pair_id)?;
            (power_up.cost() <= rules().base_match_points)
                .then(|| (index, board.partner_of(index).unwrap(), power_up))
        })
        .unwrap()
}

/// A pair whose cards are both still face down. A banished card leaves its
/// partner without one.
fn live_pair(state: &MatchState) -> (usize, usize) {
    let hidden = state.board().hidden_indices();
    hidden
        .iter()
        .find_map(|&index| {
            let partner = state.board().partner_of(index)?;
            hidden.contains(&partner).then_some((index, partner))
        })
        .unwrap()
}

fn play_out(state: &mut MatchState) {
    let mut round = 0;
    while !state.is_finished() {
        let seat = state.active_seat();
        let hidden = state.board().hidden_indices();
        let (first, second) = if round % 3 == 0 {
            (hidden[0], hidden[1])
        } else {
            live_pair(state)
        };
        flip(state, seat, first);
        flip(state, seat, second);
        round += 1;
    }
}

#[test]
fn test_power_up_spent_mid_match_replays_identically() {
    let mut live = MatchState::new("live", names(), Seat::First, rules(), SEED).unwrap();

    // Alice claims a power-up, then misses to end her turn; Bob misses back.
    let (a, b, power_up) = cheap_arcana_pair(&live);
    flip(&mut live, Seat::First, a);
    let ActionOutcome::Resolved(resolution) = flip(&mut live, Seat::First, b) else {
        panic!("second flip must resolve");
    };
    assert!(resolution.matched);
    assert_eq!(resolution.acquired, Some(power_up));

    // Not usable in the turn it was won.
    let early = live.apply(
        Seat::First,
        PlayerAction::UsePowerUp {
            power_up,
            target: None,
        },
    );
    assert_eq!(early, Err(ActionError::PowerUpOnCooldown(power_up)));

    let (x, y) = miss(&live);
    flip(&mut live, Seat::First, x);
    flip(&mut live, Seat::First, y);
    assert_eq!(live.active_seat(), Seat::Second);
    let (x, y) = miss(&live);
    flip(&mut live, Seat::Second, x);
    flip(&mut live, Seat::Second, y);
    assert_eq!(live.active_seat(), Seat::First);

    let target = power_up
        .requires_target()
        .then(|| live.board().hidden_indices()[0]);
    let before = live.player(Seat::First).score;
    assert_matches::assert_matches!(
        live.apply(Seat::First, PlayerAction::UsePowerUp { power_up, target }),
        Ok(ActionOutcome::PowerUpUsed { .. })
    );
    assert_eq!(live.player(Seat::First).score, before - power_up.cost());
    assert_eq!(live.player(Seat::First).hand.total(), 0);

    play_out(&mut live);

    let replayed =
        MatchState::replay("replay", names(), Seat::First, rules(), SEED, live.actions()).unwrap();
    assert!(replayed.is_finished());
    assert_eq!(replayed.board(), live.board());
    assert_eq!(replayed.history(), live.history());
    for seat in Seat::BOTH {
        assert_eq!(replayed.player(seat), live.player(seat));
        assert_eq!(replayed.result_for(seat), live.result_for(seat));
    }
}

#[test]
fn test_perfect_memory_scores_every_combo_step() {
    let mut state = MatchState::new("perfect", names(), Seat::Second, rules(), SEED).unwrap();
    while !state.is_finished() {
        let first = state.board().hidden_indices()[0];
        let second = state.board().partner_of(first).unwrap();
        flip(&mut state, Seat::Second, first);
        flip(&mut state, Seat::Second, second);
    }

    assert_eq!(state.player(Seat::Second).score, 360);
    assert_eq!(state.player(Seat::Second).combo_streak, 8);
    assert_eq!(state.player(Seat::Second).hand.total(), 6);
    assert_eq!(state.result_for(Seat::Second), Some(GameResult::Win));
    assert_eq!(state.result_for(Seat::First), Some(GameResult::Lose));
}

#[test]
fn test_advisor_never_suggests_an_unusable_power_up() {
    let mut state = MatchState::new("advice", names(), Seat::First, rules(), SEED).unwrap();
    let registry = HeuristicRegistry::standard();
    let mut rng = StdRng::seed_from_u64(5);

    play_out_with(&mut state, |state, seat| {
        if let Some(advice) = advise(state, seat, &registry, &mut rng) {
            let player = state.player(seat);
            assert!(player.hand.get(advice.power_up_id).usable_count > 0);
            assert!(advice.power_up_id.cost() <= player.score);
            assert!(advice.expected_value > 0.0);
            assert_eq!(advice.power_up_id.requires_target(), advice.card_index.is_some());
        }
    });
}

fn play_out_with(state: &mut MatchState, mut before_turn: impl FnMut(&MatchState, Seat)) {
    let mut round = 0;
    while !state.is_finished() {
        let seat = state.active_seat();
        before_turn(state, seat);
        let hidden = state.board().hidden_indices();
        let (first, second) = if round % 2 == 0 {
            (hidden[0], hidden[1])
        } else {
            live_pair(state)
        };
        flip(state, seat, first);
        flip(state, seat, second);
        round += 1;
    }
}
