//! Experience and player level progression.

use super::models::{round_to, UserProfile};

/// Experience needed per level, multiplied by the current level.
pub const LEVEL_EXP_UNIT: u64 = 1000;

/// Score points that convert into one experience point.
pub const SCORE_PER_EXP: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelingRules {
    pub exp_unit: u64,
    pub score_per_exp: u64,
}

impl Default for LevelingRules {
    fn default() -> Self {
        LevelingRules {
            exp_unit: LEVEL_EXP_UNIT,
            score_per_exp: SCORE_PER_EXP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelingResult {
    pub profile: UserProfile,
    pub exp_gained: u64,
    pub levels_gained: u32,
}

impl LevelingRules {
    /// Experience required to leave `level`.
    pub fn exp_needed_for_level(&self, level: u32) -> u64 {
        (level as u64).saturating_mul(self.exp_unit)
    }

    pub fn exp_for_score(&self, score: u64) -> u64 {
        score / self.score_per_exp
    }

    /// Converts a game score into experience and applies as many level-ups
    /// as the experience allows. Leftover experience is kept, and the game is
    /// added to the profile counters.
    ///
    /// `exp_unit` must be positive, [crate::config::AppConfig] enforces it.
    pub fn apply_score_gain(&self, profile: &UserProfile, score_gained: u64) -> LevelingResult {
        let exp_gained = self.exp_for_score(score_gained);
        let mut updated = *profile;
        updated.total_score = updated.total_score.saturating_add(score_gained);
        updated.games_played = updated.games_played.saturating_add(1);
        updated.highest_score = updated.highest_score.max(score_gained);
        updated.experience = updated.experience.saturating_add(exp_gained);
        updated.level = updated.level.max(1);

        let mut levels_gained = 0;
        while updated.experience >= self.exp_needed_for_level(updated.level) {
            updated.experience -= self.exp_needed_for_level(updated.level);
            updated.level = updated.level.saturating_add(1);
            levels_gained += 1;
        }

        LevelingResult {
            profile: updated,
            exp_gained,
            levels_gained,
        }
    }

    pub fn progress_percent(&self, profile: &UserProfile) -> f64 {
        let needed = self.exp_needed_for_level(profile.level);
        if needed == 0 {
            return 0.0;
        }
        round_to(profile.experience as f64 / needed as f64 * 100.0, 2)
    }
}
