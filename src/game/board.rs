//! Card layout, pair/power-up/element assignment and shuffling.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::card::{Card, CardState};
use crate::game::element::{element_for_normal_pair, Element};
use crate::game::power_up::PowerUpId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("board must hold at least one pair")]
    Empty,

    #[error("a {rows}x{cols} board has an odd number of cards")]
    OddCardCount { rows: usize, cols: usize },

    #[error("{arcana} arcana pairs exceed the {total} pairs on the board")]
    TooManyArcana { arcana: usize, total: usize },

    #[error("{arcana} arcana pairs need as many distinct power-ups, pool has {pool}")]
    PoolTooSmall { arcana: usize, pool: usize },

    #[error("layout must place every pair id exactly twice")]
    InvalidLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    arcana_pairs: usize,
    cards: Vec<Card>,
    /// Indexed by arcana pair id.
    pair_to_power_up: Vec<PowerUpId>,
}

fn validate_geometry(rows: usize, cols: usize, arcana_pairs: usize) -> Result<usize, BoardError> {
    let cards = rows * cols;
    if cards == 0 {
        return Err(BoardError::Empty);
    }
    if cards % 2 != 0 {
        return Err(BoardError::OddCardCount { rows, cols });
    }
    let total = cards / 2;
    if arcana_pairs > total {
        return Err(BoardError::TooManyArcana {
            arcana: arcana_pairs,
            total,
        });
    }
    Ok(total)
}

/// Deals a fresh board: binds the first `arcana_pairs` pair ids to a random
/// selection of distinct power-ups, then permutes every pair across the grid.
pub fn new_board<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    arcana_pairs: usize,
    power_up_pool: &[PowerUpId],
    rng: &mut R,
) -> Result<Board, BoardError> {
    let total = validate_geometry(rows, cols, arcana_pairs)?;

    let mut pool: Vec<PowerUpId> = Vec::with_capacity(power_up_pool.len());
    for id in power_up_pool {
        if !pool.contains(id) {
            pool.push(*id);
        }
    }
    if pool.len() < arcana_pairs {
        return Err(BoardError::PoolTooSmall {
            arcana: arcana_pairs,
            pool: pool.len(),
        });
    }
    pool.shuffle(rng);
    pool.truncate(arcana_pairs);

    let mut pair_ids: Vec<usize> = (0..total).flat_map(|pair| [pair, pair]).collect();
    pair_ids.shuffle(rng);

    Board::from_layout(rows, cols, pool, pair_ids)
}

impl Board {
    /// Builds a board from an explicit layout. `power_ups[i]` is bound to pair id `i`.
    pub fn from_layout(
        rows: usize,
        cols: usize,
        power_ups: Vec<PowerUpId>,
        pair_ids: Vec<usize>,
    ) -> Result<Board, BoardError> {
        let arcana_pairs = power_ups.len();
        let total = validate_geometry(rows, cols, arcana_pairs)?;
        if pair_ids.len() != rows * cols {
            return Err(BoardError::InvalidLayout);
        }

        let mut counts = vec![0usize; total];
        for &pair_id in &pair_ids {
            match counts.get_mut(pair_id) {
                Some(count) => *count += 1,
                None => return Err(BoardError::InvalidLayout),
            }
        }
        if counts.iter().any(|&count| count != 2) {
            return Err(BoardError::InvalidLayout);
        }

        let cards = pair_ids
            .into_iter()
            .enumerate()
            .map(|(index, pair_id)| Card::new(index, pair_id))
            .collect();

        Ok(Board {
            rows,
            cols,
            arcana_pairs,
            cards,
            pair_to_power_up: power_ups,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn arcana_pairs(&self) -> usize {
        self.arcana_pairs
    }

    pub fn total_pairs(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn is_arcana(&self, pair_id: usize) -> bool {
        pair_id < self.arcana_pairs
    }

    pub fn power_up_for_pair(&self, pair_id: usize) -> Option<PowerUpId> {
        self.pair_to_power_up.get(pair_id).copied()
    }

    pub fn element_of_pair(&self, pair_id: usize) -> Option<Element> {
        if self.is_arcana(pair_id) {
            None
        } else {
            Some(element_for_normal_pair(pair_id, self.arcana_pairs))
        }
    }

    pub fn partner_of(&self, index: usize) -> Option<usize> {
        let pair_id = self.cards.get(index)?.pair_id;
        self.cards
            .iter()
            .position(|card| card.pair_id == pair_id && card.index != index)
    }

    pub fn hidden_indices(&self) -> Vec<usize> {
        self.cards
            .iter()
            .filter(|card| card.is_hidden())
            .map(|card| card.index)
            .collect()
    }

    /// Pairs whose two cards are both still in play.
    pub fn remaining_pairs(&self) -> usize {
        self.live_pair_ids().len()
    }

    pub fn live_pairs_of_element(&self, element: Element) -> usize {
        self.live_pair_ids()
            .into_iter()
            .filter(|&pair_id| self.element_of_pair(pair_id) == Some(element))
            .count()
    }

    /// No pair can be completed any more. A banished card leaves its partner
    /// unmatchable, so that pair no longer counts.
    pub fn is_complete(&self) -> bool {
        self.remaining_pairs() == 0
    }

    fn live_pair_ids(&self) -> Vec<usize> {
        let mut in_play = vec![0usize; self.total_pairs()];
        for card in self.cards.iter().filter(|card| card.in_play()) {
            in_play[card.pair_id] += 1;
        }
        in_play
            .iter()
            .enumerate()
            .filter(|(_, &count)| count == 2)
            .map(|(pair_id, _)| pair_id)
            .collect()
    }

    /// Indices of the 3x3 patch centred on `index`, clamped to the board edges.
    pub fn neighbourhood(&self, index: usize) -> Vec<usize> {
        if index >= self.cards.len() {
            return Vec::new();
        }
        let row = index / self.cols;
        let col = index % self.cols;
        let row_range = row.saturating_sub(1)..=(row + 1).min(self.rows - 1);
        let col_range = col.saturating_sub(1)..=(col + 1).min(self.cols - 1);

        row_range
            .flat_map(|r| col_range.clone().map(move |c| r * self.cols + c))
            .collect()
    }

    pub(crate) fn reveal(&mut self, index: usize) {
        let element = self.element_of_pair(self.cards[index].pair_id);
        let card = &mut self.cards[index];
        card.state = CardState::Revealed;
        card.element = element;
        card.seen = true;
    }

    pub(crate) fn hide(&mut self, index: usize) {
        let card = &mut self.cards[index];
        card.state = CardState::Hidden;
        card.element = None;
    }

    pub(crate) fn mark_matched(&mut self, index: usize) {
        let element = self.element_of_pair(self.cards[index].pair_id);
        let card = &mut self.cards[index];
        card.state = CardState::Matched;
        card.element = element;
    }

    pub(crate) fn remove(&mut self, index: usize) {
        let card = &mut self.cards[index];
        card.state = CardState::Removed;
        card.element = None;
    }

    /// Re-permutes the cards still in play among their own slots. Matched
    /// cards stay put when `preserve_matched` is set; removed cards never move.
    /// Every `seen` flag is cleared, since positional knowledge is now stale.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, preserve_matched: bool, rng: &mut R) {
        let movable = |card: &Card| match card.state {
            CardState::Hidden | CardState::Revealed => true,
            CardState::Matched => !preserve_matched,
            CardState::Removed => false,
        };

        let slots: Vec<usize> = self
            .cards
            .iter()
            .filter(|card| movable(card))
            .map(|card| card.index)
            .collect();

        let mut payload: Vec<Card> = slots.iter().map(|&slot| self.cards[slot].clone()).collect();
        payload.shuffle(rng);

        for (slot, mut card) in slots.into_iter().zip(payload) {
            card.index = slot;
            self.cards[slot] = card;
        }
        for card in &mut self.cards {
            card.seen = false;
        }
    }
}
