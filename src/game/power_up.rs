use serde::{Deserialize, Serialize};

use crate::game::element::Element;

/// Power-up identifiers as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpId {
    Chaos,
    Scry,
    Banish,
    Glimpse,
    FireSight,
    WaterSight,
    AirSight,
    EarthSight,
    SecondChance,
}

/// What activating a power-up does to the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpEffect {
    /// Reshuffle every unmatched card.
    Shuffle,
    /// Private peek at the clamped 3x3 patch around the target.
    RevealPatch,
    /// Take the target card out of play without scoring.
    RemoveCard,
    /// Highlight hidden cards nobody has seen yet.
    HighlightUnseen,
    /// Highlight hidden cards of one element.
    HighlightElement(Element),
    /// Absorb the next misses without ending the turn.
    MissShield,
}

impl PowerUpId {
    pub const ALL: [PowerUpId; 9] = [
        PowerUpId::Chaos,
        PowerUpId::Scry,
        PowerUpId::Banish,
        PowerUpId::Glimpse,
        PowerUpId::FireSight,
        PowerUpId::WaterSight,
        PowerUpId::AirSight,
        PowerUpId::EarthSight,
        PowerUpId::SecondChance,
    ];

    pub fn effect(&self) -> PowerUpEffect {
        match self {
            PowerUpId::Chaos => PowerUpEffect::Shuffle,
            PowerUpId::Scry => PowerUpEffect::RevealPatch,
            PowerUpId::Banish => PowerUpEffect::RemoveCard,
            PowerUpId::Glimpse => PowerUpEffect::HighlightUnseen,
            PowerUpId::FireSight => PowerUpEffect::HighlightElement(Element::Fire),
            PowerUpId::WaterSight => PowerUpEffect::HighlightElement(Element::Water),
            PowerUpId::AirSight => PowerUpEffect::HighlightElement(Element::Air),
            PowerUpId::EarthSight => PowerUpEffect::HighlightElement(Element::Earth),
            PowerUpId::SecondChance => PowerUpEffect::MissShield,
        }
    }

    /// Score deducted on activation.
    pub fn cost(&self) -> u32 {
        match self {
            PowerUpId::Scry | PowerUpId::SecondChance => 20,
            _ => 10,
        }
    }

    pub fn requires_target(&self) -> bool {
        matches!(self, PowerUpId::Scry | PowerUpId::Banish)
    }

    pub fn element(&self) -> Option<Element> {
        match self.effect() {
            PowerUpEffect::HighlightElement(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUpId::Chaos => "chaos",
            PowerUpId::Scry => "scry",
            PowerUpId::Banish => "banish",
            PowerUpId::Glimpse => "glimpse",
            PowerUpId::FireSight => "fire_sight",
            PowerUpId::WaterSight => "water_sight",
            PowerUpId::AirSight => "air_sight",
            PowerUpId::EarthSight => "earth_sight",
            PowerUpId::SecondChance => "second_chance",
        }
    }
}

impl std::fmt::Display for PowerUpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
