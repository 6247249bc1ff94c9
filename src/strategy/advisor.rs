use rand::RngCore;
use serde::Serialize;

use crate::game::match_state::{MatchState, Phase, Seat};
use crate::game::power_up::PowerUpId;
use crate::strategy::memory::Memory;
use crate::strategy::registry::{EvalContext, HeuristicRegistry};

/// Suggested power-up for the active player.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub power_up_id: PowerUpId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_index: Option<usize>,
    pub expected_value: f64,
}

/// Picks the held, usable and affordable power-up with the best positive
/// expected value for `seat`, along with a target when it needs one.
/// Returns `None` when nothing is worth spending or it is not `seat`'s move.
pub fn advise(
    state: &MatchState,
    seat: Seat,
    registry: &HeuristicRegistry,
    rng: &mut dyn RngCore,
) -> Option<Advice> {
    if state.is_finished() || state.active_seat() != seat || state.turn().phase != Phase::FirstFlip {
        return None;
    }

    let player = state.player(seat);
    let memory = Memory::from_history(state.history(), seat);
    let ctx = EvalContext::new(state.board(), &memory);

    let mut best: Option<Advice> = None;
    for power_up in player.hand.usable() {
        if power_up.cost() > player.score {
            continue;
        }
        let expected_value = registry.evaluate(power_up, &ctx);
        if expected_value <= 0.0 {
            continue;
        }
        let card_index = if power_up.requires_target() {
            match registry.pick_target(power_up, &ctx, rng) {
                Some(index) => Some(index),
                None => continue,
            }
        } else {
            None
        };

        let better = match &best {
            None => true,
            Some(current) => {
                expected_value > current.expected_value
                    || (expected_value == current.expected_value
                        && power_up.cost() < current.power_up_id.cost())
            }
        };
        if better {
            best = Some(Advice {
                power_up_id: power_up,
                card_index,
                expected_value,
            });
        }
    }

    log::debug!(
        "🧮 [{}] advice for {:?}: {:?} ({} remembered cards)",
        state.id(),
        seat,
        best,
        memory.len()
    );
    best
}
