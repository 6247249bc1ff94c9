use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::power_up::PowerUpId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandEntry {
    pub count: u32,
    pub usable_count: u32,
}

/// Power-ups held by one player. Newly acquired copies stay on cooldown
/// until the next turn boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    entries: BTreeMap<PowerUpId, HandEntry>,
}

impl Hand {
    pub fn get(&self, id: PowerUpId) -> HandEntry {
        self.entries.get(&id).copied().unwrap_or_default()
    }

    pub fn acquire(&mut self, id: PowerUpId) {
        self.entries.entry(id).or_default().count += 1;
    }

    /// Consumes one usable copy. Returns false when none is usable.
    pub fn spend(&mut self, id: PowerUpId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if entry.usable_count > 0 => {
                entry.count -= 1;
                entry.usable_count -= 1;
                if entry.count == 0 {
                    self.entries.remove(&id);
                }
                true
            }
            _ => false,
        }
    }

    pub fn promote_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.usable_count = entry.count;
        }
    }

    pub fn usable(&self) -> impl Iterator<Item = PowerUpId> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.usable_count > 0)
            .map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PowerUpId, HandEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, *entry))
    }

    pub fn total(&self) -> u32 {
        self.entries.values().map(|entry| entry.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub score: u32,
    pub hand: Hand,
    pub combo_streak: u32,
    /// Misses still absorbed by an active `second_chance`.
    pub shield: u32,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
            hand: Hand::default(),
            combo_streak: 0,
            shield: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquired_power_up_waits_for_turn_boundary() {
        let mut hand = Hand::default();
        hand.acquire(PowerUpId::Chaos);

        assert_eq!(hand.get(PowerUpId::Chaos), HandEntry { count: 1, usable_count: 0 });
        assert!(!hand.spend(PowerUpId::Chaos));

        hand.promote_all();
        assert_eq!(hand.usable().collect::<Vec<_>>(), vec![PowerUpId::Chaos]);
        assert!(hand.spend(PowerUpId::Chaos));
        assert_eq!(hand.get(PowerUpId::Chaos), HandEntry::default());
        assert_eq!(hand.total(), 0);
    }

    #[test]
    fn test_second_copy_keeps_first_usable() {
        let mut hand = Hand::default();
        hand.acquire(PowerUpId::Scry);
        hand.promote_all();
        hand.acquire(PowerUpId::Scry);

        let entry = hand.get(PowerUpId::Scry);
        assert_eq!(entry.count, 2);
        assert_eq!(entry.usable_count, 1);
        assert!(hand.spend(PowerUpId::Scry));
        assert!(!hand.spend(PowerUpId::Scry));
    }
}
