//! Power-up heuristics, keyed by power-up id.
//!
//! The registry is built once at startup and shared read-only. Each entry
//! may provide an expected-value function, a target picker, both or neither;
//! anything without an evaluator reports [`NOT_EVALUABLE`].

use std::collections::{BTreeSet, HashMap};

use rand::seq::IndexedRandom;
use rand::RngCore;

use crate::game::board::Board;
use crate::game::power_up::{PowerUpEffect, PowerUpId};
use crate::strategy::memory::{has_known_pair, Memory};
use crate::strategy::probability::{expected_pairs_from_reveal, random_match_prob};

/// Sentinel for "do not consider this power-up".
pub const NOT_EVALUABLE: f64 = -1.0;

/// Cards shown by a reveal-class power-up (a full 3x3 patch).
pub const REVEAL_PATCH_SIZE: usize = 9;

/// Read-only view a heuristic works from.
pub struct EvalContext<'a> {
    pub board: &'a Board,
    pub memory: &'a Memory,
    pub hidden: BTreeSet<usize>,
    pub pairs_remaining: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(board: &'a Board, memory: &'a Memory) -> Self {
        Self {
            board,
            memory,
            hidden: board.hidden_indices().into_iter().collect(),
            pairs_remaining: board.remaining_pairs(),
        }
    }
}

pub type EvaluateFn = fn(PowerUpId, &EvalContext<'_>) -> f64;
pub type PickTargetFn = fn(PowerUpId, &EvalContext<'_>, &mut dyn RngCore) -> Option<usize>;

#[derive(Clone, Copy, Default)]
pub struct PowerUpHeuristic {
    pub evaluate: Option<EvaluateFn>,
    pub pick_target: Option<PickTargetFn>,
}

#[derive(Clone, Default)]
pub struct HeuristicRegistry {
    entries: HashMap<PowerUpId, PowerUpHeuristic>,
}

impl HeuristicRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Heuristics for every power-up that has one.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for id in PowerUpId::ALL {
            match id.effect() {
                PowerUpEffect::RevealPatch => {
                    registry = registry.register(
                        id,
                        PowerUpHeuristic {
                            evaluate: Some(reveal_patch_ev),
                            pick_target: Some(reveal_patch_target),
                        },
                    );
                }
                PowerUpEffect::HighlightElement(_) => {
                    registry = registry.register(
                        id,
                        PowerUpHeuristic {
                            evaluate: Some(element_ev),
                            pick_target: None,
                        },
                    );
                }
                _ => {}
            }
        }
        registry
    }

    pub fn register(mut self, id: PowerUpId, heuristic: PowerUpHeuristic) -> Self {
        self.entries.insert(id, heuristic);
        self
    }

    pub fn get(&self, id: PowerUpId) -> Option<&PowerUpHeuristic> {
        self.entries.get(&id)
    }

    pub fn evaluate(&self, id: PowerUpId, ctx: &EvalContext<'_>) -> f64 {
        match self.get(id).and_then(|heuristic| heuristic.evaluate) {
            Some(evaluate) => evaluate(id, ctx),
            None => NOT_EVALUABLE,
        }
    }

    pub fn pick_target(
        &self,
        id: PowerUpId,
        ctx: &EvalContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        self.get(id)
            .and_then(|heuristic| heuristic.pick_target)
            .and_then(|pick| pick(id, ctx, rng))
    }
}

pub fn reveal_patch_ev(_id: PowerUpId, ctx: &EvalContext<'_>) -> f64 {
    expected_pairs_from_reveal(ctx.pairs_remaining, REVEAL_PATCH_SIZE)
}

/// Hidden centre whose clamped 3x3 patch covers the most hidden cards.
/// Ties are broken uniformly at random.
pub fn reveal_patch_target(
    _id: PowerUpId,
    ctx: &EvalContext<'_>,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    let mut best = 0;
    let mut candidates = Vec::new();
    for &center in &ctx.hidden {
        let covered = ctx
            .board
            .neighbourhood(center)
            .iter()
            .filter(|index| ctx.hidden.contains(index))
            .count();
        if covered > best {
            best = covered;
            candidates.clear();
        }
        if covered == best {
            candidates.push(center);
        }
    }
    candidates.choose(rng).copied()
}

/// Value of acting on one element, given what the observer remembers.
///
/// The known-pair branch also credits a match that a plain flip could claim.
pub fn element_ev(id: PowerUpId, ctx: &EvalContext<'_>) -> f64 {
    let Some(element) = id.element() else {
        return NOT_EVALUABLE;
    };
    let p = ctx.pairs_remaining;

    let mut of_element = Memory::default();
    for (index, pair_id) in ctx.memory.hidden_entries(&ctx.hidden) {
        if ctx.board.element_of_pair(pair_id) == Some(element) {
            of_element.insert(index, pair_id);
        }
    }

    if has_known_pair(&of_element, &ctx.hidden) {
        return if p <= 1 {
            1.0
        } else {
            1.0 + random_match_prob(p - 1)
        };
    }

    if of_element.is_empty() {
        return 0.0;
    }

    let live = ctx.board.live_pairs_of_element(element) as i64;
    let other_cards = 2 * live - 1;
    if other_cards <= 0 {
        return 1.0;
    }
    let match_prob = 1.0 / other_cards as f64;
    if p > 1 {
        match_prob * (1.0 + random_match_prob(p - 1))
    } else {
        match_prob
    }
}
