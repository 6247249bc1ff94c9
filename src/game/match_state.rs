//! Per-match turn and card state machine.
//!
//! A `MatchState` is owned by exactly one match worker. Every mutation goes
//! through [`MatchState::apply`], which either performs the whole transition
//! or rejects the action without touching anything.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game::board::{new_board, Board, BoardError};
use crate::game::power_up::{PowerUpEffect, PowerUpId};
use crate::game::player::Player;
use crate::game::rules::GameRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub const BOTH: [Seat; 2] = [Seat::First, Seat::Second];

    pub fn index(&self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }

    pub fn opponent(&self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    FirstFlip,
    SecondFlip,
    Resolve,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::FirstFlip => "first_flip",
            Phase::SecondFlip => "second_flip",
            Phase::Resolve => "resolve",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub active: Seat,
    pub phase: Phase,
    pub flipped: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerAction {
    Flip { index: usize },
    UsePowerUp { power_up: PowerUpId, target: Option<usize> },
    TimeoutPass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedAction {
    pub seat: Seat,
    pub action: PlayerAction,
}

/// What each observer could have learned so far. Heuristic memory is rebuilt from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A card turned face up in front of both players.
    Flip { index: usize, pair_id: usize },
    /// Cards only `seat` saw.
    Peek { seat: Seat, cards: Vec<(usize, usize)> },
    Shuffle,
    Removed { index: usize },
}

/// Highlights and peeks granted to the active player for the current turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnEffects {
    pub highlights: BTreeSet<usize>,
    pub peeks: BTreeSet<usize>,
}

impl TurnEffects {
    fn clear(&mut self) {
        self.highlights.clear();
        self.peeks.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub seat: Seat,
    pub indices: [usize; 2],
    pub pair_ids: [usize; 2],
    pub matched: bool,
    pub points: u32,
    pub acquired: Option<PowerUpId>,
    /// The miss was absorbed by a shield charge.
    pub shielded: bool,
    pub turn_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Flipped { index: usize },
    Resolved(Resolution),
    PowerUpUsed {
        power_up: PowerUpId,
        target: Option<usize>,
        affected: Vec<usize>,
    },
    TurnPassed { from: Seat },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("the match is already over")]
    MatchOver,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("action not allowed during {0}")]
    WrongPhase(Phase),

    #[error("card {0} does not exist")]
    InvalidIndex(usize),

    #[error("card {0} is not face down")]
    CardNotHidden(usize),

    #[error("card {0} is already flipped this turn")]
    SameCard(usize),

    #[error("you do not hold {0}")]
    PowerUpNotHeld(PowerUpId),

    #[error("{0} is still on cooldown")]
    PowerUpOnCooldown(PowerUpId),

    #[error("{power_up} costs {cost}, you have {score}")]
    CannotAfford {
        power_up: PowerUpId,
        cost: u32,
        score: u32,
    },

    #[error("{0} needs a target card")]
    MissingTarget(PowerUpId),

    #[error("{0} does not take a target")]
    UnexpectedTarget(PowerUpId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Lose,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    Completed,
    Forfeit { loser: Seat },
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchEnd {
    pub reason: EndReason,
    pub winner: Option<Seat>,
}

#[derive(Debug, Clone)]
pub struct MatchState {
    id: String,
    rules: GameRules,
    seed: u64,
    first_seat: Seat,
    rng: StdRng,
    board: Board,
    players: [Player; 2],
    turn: TurnState,
    effects: TurnEffects,
    history: Vec<HistoryEvent>,
    actions: Vec<LoggedAction>,
    end: Option<MatchEnd>,
}

impl MatchState {
    /// Deals a board from `seed`. The same seed, first seat and action log
    /// always reproduce the same match.
    pub fn new(
        id: impl Into<String>,
        names: [String; 2],
        first_seat: Seat,
        rules: GameRules,
        seed: u64,
    ) -> Result<Self, BoardError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let board = new_board(
            rules.rows,
            rules.cols,
            rules.arcana_pairs,
            &rules.power_up_pool,
            &mut rng,
        )?;
        Ok(Self::assemble(id.into(), names, first_seat, rules, board, seed, rng))
    }

    /// Starts a match on a prepared board.
    pub fn with_board(
        id: impl Into<String>,
        names: [String; 2],
        first_seat: Seat,
        rules: GameRules,
        board: Board,
        seed: u64,
    ) -> Self {
        let rng = StdRng::seed_from_u64(seed);
        Self::assemble(id.into(), names, first_seat, rules, board, seed, rng)
    }

    fn assemble(
        id: String,
        names: [String; 2],
        first_seat: Seat,
        rules: GameRules,
        board: Board,
        seed: u64,
        rng: StdRng,
    ) -> Self {
        let [first_name, second_name] = names;
        Self {
            id,
            rules,
            seed,
            first_seat,
            rng,
            board,
            players: [Player::new(first_name), Player::new(second_name)],
            turn: TurnState {
                active: first_seat,
                phase: Phase::FirstFlip,
                flipped: Vec::with_capacity(2),
            },
            effects: TurnEffects::default(),
            history: Vec::new(),
            actions: Vec::new(),
            end: None,
        }
    }

    /// Rebuilds a match from its seed and action log.
    pub fn replay(
        id: impl Into<String>,
        names: [String; 2],
        first_seat: Seat,
        rules: GameRules,
        seed: u64,
        actions: &[LoggedAction],
    ) -> Result<Self, crate::ArcanaError> {
        let mut state = Self::new(id, names, first_seat, rules, seed)?;
        for logged in actions {
            state.apply(logged.seat, logged.action.clone())?;
        }
        Ok(state)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn first_seat(&self) -> Seat {
        self.first_seat
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn player(&self, seat: Seat) -> &Player {
        &self.players[seat.index()]
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn active_seat(&self) -> Seat {
        self.turn.active
    }

    pub fn effects(&self) -> &TurnEffects {
        &self.effects
    }

    pub fn history(&self) -> &[HistoryEvent] {
        &self.history
    }

    pub fn actions(&self) -> &[LoggedAction] {
        &self.actions
    }

    pub fn end(&self) -> Option<MatchEnd> {
        self.end
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    pub fn result_for(&self, seat: Seat) -> Option<GameResult> {
        self.end.map(|end| match end.winner {
            Some(winner) if winner == seat => GameResult::Win,
            Some(_) => GameResult::Lose,
            None => GameResult::Draw,
        })
    }

    /// Applies one action for `seat`. Rejected actions leave the state untouched.
    pub fn apply(&mut self, seat: Seat, action: PlayerAction) -> Result<ActionOutcome, ActionError> {
        if self.is_finished() {
            return Err(ActionError::MatchOver);
        }
        if seat != self.turn.active {
            return Err(ActionError::NotYourTurn);
        }

        let outcome = match &action {
            PlayerAction::Flip { index } => self.flip(*index)?,
            PlayerAction::UsePowerUp { power_up, target } => self.use_power_up(*power_up, *target)?,
            PlayerAction::TimeoutPass => self.timeout_pass(),
        };

        self.actions.push(LoggedAction { seat, action });
        Ok(outcome)
    }

    /// The active player ran out of time: any pending flip is turned back and
    /// the turn passes as after a miss. Shields do not absorb a timeout.
    fn timeout_pass(&mut self) -> ActionOutcome {
        let from = self.turn.active;
        for index in std::mem::take(&mut self.turn.flipped) {
            self.board.hide(index);
        }
        self.players[from.index()].combo_streak = 0;
        self.turn.phase = Phase::FirstFlip;
        self.pass_turn();
        ActionOutcome::TurnPassed { from }
    }

    fn flip(&mut self, index: usize) -> Result<ActionOutcome, ActionError> {
        let card = self.board.card(index).ok_or(ActionError::InvalidIndex(index))?;

        match self.turn.phase {
            Phase::FirstFlip => {
                if !card.is_hidden() {
                    return Err(ActionError::CardNotHidden(index));
                }
                self.reveal(index);
                self.turn.flipped.push(index);
                self.turn.phase = Phase::SecondFlip;
                Ok(ActionOutcome::Flipped { index })
            }
            Phase::SecondFlip => {
                if self.turn.flipped.first() == Some(&index) {
                    return Err(ActionError::SameCard(index));
                }
                if !card.is_hidden() {
                    return Err(ActionError::CardNotHidden(index));
                }
                self.reveal(index);
                self.turn.flipped.push(index);
                self.turn.phase = Phase::Resolve;
                Ok(ActionOutcome::Resolved(self.resolve()))
            }
            Phase::Resolve => Err(ActionError::WrongPhase(Phase::Resolve)),
        }
    }

    fn reveal(&mut self, index: usize) {
        self.board.reveal(index);
        let pair_id = self.board.cards()[index].pair_id;
        self.history.push(HistoryEvent::Flip { index, pair_id });
    }

    fn resolve(&mut self) -> Resolution {
        let seat = self.turn.active;
        let indices = [self.turn.flipped[0], self.turn.flipped[1]];
        let pair_ids = [
            self.board.cards()[indices[0]].pair_id,
            self.board.cards()[indices[1]].pair_id,
        ];
        let matched = pair_ids[0] == pair_ids[1];

        let mut points = 0;
        let mut acquired = None;
        let mut shielded = false;
        let mut turn_passed = false;

        if matched {
            self.board.mark_matched(indices[0]);
            self.board.mark_matched(indices[1]);
            acquired = self.board.power_up_for_pair(pair_ids[0]);

            let player = &mut self.players[seat.index()];
            points = self.rules.match_points(player.combo_streak);
            player.score += points;
            player.combo_streak += 1;
            if let Some(power_up) = acquired {
                player.hand.acquire(power_up);
            }
        } else {
            self.board.hide(indices[0]);
            self.board.hide(indices[1]);

            let player = &mut self.players[seat.index()];
            player.combo_streak = 0;
            if player.shield > 0 {
                player.shield -= 1;
                shielded = true;
            } else {
                turn_passed = true;
            }
        }

        self.turn.flipped.clear();
        self.turn.phase = Phase::FirstFlip;
        if turn_passed {
            self.pass_turn();
        }
        self.check_completion();

        Resolution {
            seat,
            indices,
            pair_ids,
            matched,
            points,
            acquired,
            shielded,
            turn_passed,
        }
    }

    /// Turn boundary: the other seat becomes active, this turn's highlights
    /// and peeks expire and every cooldown ends.
    fn pass_turn(&mut self) {
        self.turn.active = self.turn.active.opponent();
        self.effects.clear();
        for player in &mut self.players {
            player.hand.promote_all();
        }
    }

    fn use_power_up(
        &mut self,
        power_up: PowerUpId,
        target: Option<usize>,
    ) -> Result<ActionOutcome, ActionError> {
        if self.turn.phase != Phase::FirstFlip {
            return Err(ActionError::WrongPhase(self.turn.phase));
        }

        let seat = self.turn.active;
        let player = &self.players[seat.index()];
        let entry = player.hand.get(power_up);
        if entry.count == 0 {
            return Err(ActionError::PowerUpNotHeld(power_up));
        }
        if entry.usable_count == 0 {
            return Err(ActionError::PowerUpOnCooldown(power_up));
        }
        let cost = power_up.cost();
        if cost > player.score {
            return Err(ActionError::CannotAfford {
                power_up,
                cost,
                score: player.score,
            });
        }

        match (power_up.requires_target(), target) {
            (true, None) => return Err(ActionError::MissingTarget(power_up)),
            (false, Some(_)) => return Err(ActionError::UnexpectedTarget(power_up)),
            (true, Some(index)) => {
                let card = self.board.card(index).ok_or(ActionError::InvalidIndex(index))?;
                if power_up.effect() == PowerUpEffect::RemoveCard && !card.is_hidden() {
                    return Err(ActionError::CardNotHidden(index));
                }
            }
            (false, None) => {}
        }

        let player = &mut self.players[seat.index()];
        let spent = player.hand.spend(power_up);
        debug_assert!(spent);
        player.score -= cost;

        let affected = self.apply_effect(seat, power_up.effect(), target);
        self.check_completion();

        Ok(ActionOutcome::PowerUpUsed {
            power_up,
            target,
            affected,
        })
    }

    fn apply_effect(&mut self, seat: Seat, effect: PowerUpEffect, target: Option<usize>) -> Vec<usize> {
        match effect {
            PowerUpEffect::Shuffle => {
                self.board.shuffle(true, &mut self.rng);
                self.history.push(HistoryEvent::Shuffle);
                self.effects.clear();
                Vec::new()
            }
            PowerUpEffect::RevealPatch => {
                let patch: Vec<usize> = target
                    .map(|center| self.board.neighbourhood(center))
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|&index| self.board.cards()[index].is_hidden())
                    .collect();
                let cards = patch
                    .iter()
                    .map(|&index| (index, self.board.cards()[index].pair_id))
                    .collect();
                self.history.push(HistoryEvent::Peek { seat, cards });
                self.effects.peeks.extend(patch.iter().copied());
                patch
            }
            PowerUpEffect::RemoveCard => match target {
                Some(index) => {
                    self.board.remove(index);
                    self.history.push(HistoryEvent::Removed { index });
                    self.effects.peeks.remove(&index);
                    self.effects.highlights.remove(&index);
                    vec![index]
                }
                None => Vec::new(),
            },
            PowerUpEffect::HighlightUnseen => {
                let unseen: Vec<usize> = self
                    .board
                    .cards()
                    .iter()
                    .filter(|card| card.is_hidden() && !card.seen)
                    .map(|card| card.index)
                    .collect();
                self.effects.highlights.extend(unseen.iter().copied());
                unseen
            }
            PowerUpEffect::HighlightElement(element) => {
                let lit: Vec<usize> = self
                    .board
                    .cards()
                    .iter()
                    .filter(|card| {
                        card.is_hidden() && self.board.element_of_pair(card.pair_id) == Some(element)
                    })
                    .map(|card| card.index)
                    .collect();
                self.effects.highlights.extend(lit.iter().copied());
                lit
            }
            PowerUpEffect::MissShield => {
                self.players[seat.index()].shield += self.rules.shield_rounds;
                Vec::new()
            }
        }
    }

    fn check_completion(&mut self) {
        if self.end.is_some() || !self.board.is_complete() {
            return;
        }
        let first = self.players[0].score;
        let second = self.players[1].score;
        let winner = match first.cmp(&second) {
            std::cmp::Ordering::Greater => Some(Seat::First),
            std::cmp::Ordering::Less => Some(Seat::Second),
            std::cmp::Ordering::Equal => None,
        };
        self.end = Some(MatchEnd {
            reason: EndReason::Completed,
            winner,
        });
    }

    /// `loser` left and did not come back in time.
    pub fn forfeit(&mut self, loser: Seat) {
        if self.end.is_none() {
            self.end = Some(MatchEnd {
                reason: EndReason::Forfeit { loser },
                winner: Some(loser.opponent()),
            });
        }
    }

    /// Both players left.
    pub fn abandon(&mut self) {
        if self.end.is_none() {
            self.end = Some(MatchEnd {
                reason: EndReason::Abandoned,
                winner: None,
            });
        }
    }
}
