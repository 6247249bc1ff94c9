use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Water,
    Air,
    Earth,
}

impl Element {
    pub const ALL: [Element; 4] = [Element::Fire, Element::Water, Element::Air, Element::Earth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Air => "air",
            Element::Earth => "earth",
        }
    }
}

/// One face design for a normal pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub name: &'static str,
    pub element: Element,
}

/// Twelve symbols, three per element, interleaved so that consecutive
/// normal pairs never share an element.
pub const PALETTE: [Symbol; 12] = [
    Symbol { name: "ember", element: Element::Fire },
    Symbol { name: "tide", element: Element::Water },
    Symbol { name: "gale", element: Element::Air },
    Symbol { name: "stone", element: Element::Earth },
    Symbol { name: "flame", element: Element::Fire },
    Symbol { name: "wave", element: Element::Water },
    Symbol { name: "breeze", element: Element::Air },
    Symbol { name: "root", element: Element::Earth },
    Symbol { name: "blaze", element: Element::Fire },
    Symbol { name: "rain", element: Element::Water },
    Symbol { name: "storm", element: Element::Air },
    Symbol { name: "crystal", element: Element::Earth },
];

/// Palette slot of a normal pair. Arcana pair ids sit below `arcana_pairs`
/// and are shifted out so the first normal pair always lands on slot 0.
pub fn symbol_for_normal_pair(pair_id: usize, arcana_pairs: usize) -> Symbol {
    let len = PALETTE.len() as i64;
    let offset = pair_id as i64 - arcana_pairs as i64;
    let slot = ((offset % len) + len) % len;
    PALETTE[slot as usize]
}

pub fn element_for_normal_pair(pair_id: usize, arcana_pairs: usize) -> Element {
    symbol_for_normal_pair(pair_id, arcana_pairs).element
}
