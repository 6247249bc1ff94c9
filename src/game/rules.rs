use crate::game::power_up::PowerUpId;

/// Per-match rule set, fixed when the match is created.
#[derive(Debug, Clone)]
pub struct GameRules {
    pub rows: usize,
    pub cols: usize,
    pub arcana_pairs: usize,
    /// Power-ups the arcana pairs are drawn from.
    pub power_up_pool: Vec<PowerUpId>,
    /// Points for a match before the combo multiplier.
    pub base_match_points: u32,
    /// Misses absorbed by one `second_chance`.
    pub shield_rounds: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 6,
            arcana_pairs: 6,
            power_up_pool: PowerUpId::ALL.to_vec(),
            base_match_points: 10,
            shield_rounds: 2,
        }
    }
}

impl GameRules {
    pub fn total_pairs(&self) -> usize {
        self.rows * self.cols / 2
    }

    /// Points for a match made with `combo_streak` previous consecutive matches.
    pub fn match_points(&self, combo_streak: u32) -> u32 {
        self.base_match_points * (combo_streak + 1)
    }
}
