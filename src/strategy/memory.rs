use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::game::match_state::{HistoryEvent, Seat};

/// What one observer knows: card index -> pair id for cards it has seen.
/// Rebuilt from match history for every decision, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    known: BTreeMap<usize, usize>,
}

impl Memory {
    pub fn from_history(history: &[HistoryEvent], observer: Seat) -> Self {
        let mut memory = Memory::default();
        for event in history {
            match event {
                HistoryEvent::Flip { index, pair_id } => memory.insert(*index, *pair_id),
                HistoryEvent::Peek { seat, cards } if *seat == observer => {
                    for &(index, pair_id) in cards {
                        memory.insert(index, pair_id);
                    }
                }
                HistoryEvent::Peek { .. } => {}
                HistoryEvent::Shuffle => memory.known.clear(),
                HistoryEvent::Removed { index } => {
                    memory.known.remove(index);
                }
            }
        }
        memory
    }

    pub fn insert(&mut self, index: usize, pair_id: usize) {
        self.known.insert(index, pair_id);
    }

    pub fn get(&self, index: usize) -> Option<usize> {
        self.known.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.known.iter().map(|(index, pair_id)| (*index, *pair_id))
    }

    /// Known entries whose card is still face down.
    pub fn hidden_entries<'a>(
        &'a self,
        hidden: &'a BTreeSet<usize>,
    ) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.iter().filter(move |(index, _)| hidden.contains(index))
    }
}

/// True when two remembered, still-hidden cards share a pair id: a risk-free match.
pub fn has_known_pair(memory: &Memory, hidden: &BTreeSet<usize>) -> bool {
    let mut pairs = HashSet::new();
    memory
        .hidden_entries(hidden)
        .any(|(_, pair_id)| !pairs.insert(pair_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_public_flips_are_shared_and_peeks_are_private() {
        let history = vec![
            HistoryEvent::Flip { index: 0, pair_id: 4 },
            HistoryEvent::Peek { seat: Seat::Second, cards: vec![(3, 1), (5, 2)] },
        ];
        let first = Memory::from_history(&history, Seat::First);
        let second = Memory::from_history(&history, Seat::Second);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 3);
        assert_eq!(second.get(5), Some(2));
        assert_eq!(first.get(5), None);
    }

    #[test]
    fn test_shuffle_and_removal_forget() {
        let history = vec![
            HistoryEvent::Flip { index: 0, pair_id: 4 },
            HistoryEvent::Flip { index: 1, pair_id: 3 },
            HistoryEvent::Shuffle,
            HistoryEvent::Flip { index: 2, pair_id: 7 },
            HistoryEvent::Flip { index: 6, pair_id: 8 },
            HistoryEvent::Removed { index: 6 },
        ];
        let memory = Memory::from_history(&history, Seat::First);
        assert_eq!(memory.iter().collect::<Vec<_>>(), vec![(2, 7)]);
    }

    #[test]
    fn test_has_known_pair_needs_both_cards_hidden() {
        let mut memory = Memory::default();
        memory.insert(0, 5);
        memory.insert(7, 5);
        memory.insert(3, 1);

        assert!(has_known_pair(&memory, &hidden(&[0, 3, 7, 9])));
        assert!(!has_known_pair(&memory, &hidden(&[0, 3, 9])));
        assert!(!has_known_pair(&Memory::default(), &hidden(&[0, 1])));
    }
}
