//! Achievement catalog and evaluation.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::models::{GameSessionRecord, UserProfile, UserStats};

pub type AchievementId = &'static str;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// What a player has to do to unlock an achievement.
///
/// Conditions on a single game read the latest session and are unsatisfied
/// when there is none. `TotalLines` and `TotalGames` read lifetime stats,
/// `GamesPlayed` reads the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum AchievementCondition {
    /// Exactly this many games played, so it only fires once.
    GamesPlayed(u64),
    Score(u64),
    Level(u32),
    LinesInGame(u32),
    TotalLines(u64),
    TotalGames(u64),
    TetrisCleared(u32),
    TSpins(u32),
    MaxCombo(u32),
    /// Strictly shorter than the threshold, in seconds. Zero-length games don't count.
    DurationUnder(u64),
    /// Strictly longer than the threshold, in seconds.
    DurationOver(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rarity: Rarity,
    pub condition: AchievementCondition,
}

/// Snapshot the evaluation runs against, taken after stats and leveling
/// have been updated for the latest session.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub stats: &'a UserStats,
    pub profile: &'a UserProfile,
    pub latest_session: Option<&'a GameSessionRecord>,
}

impl AchievementCondition {
    pub fn is_satisfied(&self, ctx: &EvaluationContext) -> bool {
        let session = ctx.latest_session;
        match *self {
            AchievementCondition::GamesPlayed(count) => ctx.profile.games_played == count,
            AchievementCondition::TotalGames(count) => ctx.stats.total_games >= count,
            AchievementCondition::TotalLines(lines) => ctx.stats.total_lines_cleared >= lines,
            AchievementCondition::Score(score) => session.is_some_and(|s| s.score >= score),
            AchievementCondition::Level(level) => session.is_some_and(|s| s.final_level >= level),
            AchievementCondition::LinesInGame(lines) => {
                session.is_some_and(|s| s.lines_cleared >= lines)
            }
            AchievementCondition::TetrisCleared(count) => {
                session.is_some_and(|s| s.tetrises_cleared >= count)
            }
            AchievementCondition::TSpins(count) => session.is_some_and(|s| s.t_spins >= count),
            AchievementCondition::MaxCombo(combo) => session.is_some_and(|s| s.max_combo >= combo),
            AchievementCondition::DurationUnder(secs) => session
                .and_then(GameSessionRecord::duration_seconds)
                .is_some_and(|d| d > 0 && d < secs),
            AchievementCondition::DurationOver(secs) => session
                .and_then(GameSessionRecord::duration_seconds)
                .is_some_and(|d| d > secs),
        }
    }
}

const fn achievement(
    id: AchievementId,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    rarity: Rarity,
    condition: AchievementCondition,
) -> Achievement {
    Achievement {
        id,
        name,
        description,
        icon,
        rarity,
        condition,
    }
}

use AchievementCondition::*;
use Rarity::*;

pub const ACHIEVEMENTS: &[Achievement] = &[
    achievement("first_steps", "First Steps", "Complete your first game", "play-circle", Common, GamesPlayed(1)),
    achievement("line_clearer", "Line Clearer", "Clear 10 lines in a single game", "zap", Common, LinesInGame(10)),
    achievement("century_club", "Century Club", "Score 1000 points in a single game", "target", Common, Score(1_000)),
    achievement("line_master", "Line Master", "Clear 50 lines in a single game", "award", Rare, LinesInGame(50)),
    achievement("high_scorer", "High Scorer", "Score 5000 points in a single game", "star", Rare, Score(5_000)),
    achievement("tetris_master", "Tetris Master", "Clear 4 lines at once (Tetris)", "crown", Rare, TetrisCleared(1)),
    achievement("speed_runner", "Speed Runner", "Complete a game in under 60 seconds", "clock", Epic, DurationUnder(60)),
    achievement("marathon_runner", "Marathon Runner", "Play for more than 10 minutes", "timer", Rare, DurationOver(600)),
    achievement("combo_king", "Combo King", "Achieve a 5+ line combo", "trending-up", Epic, MaxCombo(5)),
    achievement("perfect_game", "Perfect Game", "Score 10,000 points in a single game", "gem", Epic, Score(10_000)),
    achievement("score_chaser", "Score Chaser", "Score 25,000 points in a single game", "flame", Epic, Score(25_000)),
    achievement("legendary_player", "Legendary Player", "Score 50,000 points in a single game", "trophy", Legendary, Score(50_000)),
    achievement("t_spin_wizard", "T-Spin Wizard", "Perform 5 T-spins in a single game", "rotate-cw", Legendary, TSpins(5)),
    achievement("regular", "Regular", "Play 10 games", "calendar", Common, TotalGames(10)),
    achievement("committed", "Committed", "Play 50 games", "repeat", Rare, TotalGames(50)),
    achievement("dedicated_player", "Dedicated Player", "Play 100 games", "heart", Epic, TotalGames(100)),
    achievement("level_5_climber", "Level 5 Climber", "Reach level 5 in a game", "bar-chart", Common, Level(5)),
    achievement("level_10_master", "Level 10 Master", "Reach level 10 in a game", "trending-up", Rare, Level(10)),
    achievement("line_veteran", "Line Veteran", "Clear 100 lines in total", "layers", Common, TotalLines(100)),
    achievement("line_legend", "Line Legend", "Clear 500 lines in total", "database", Rare, TotalLines(500)),
];

pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Returns the ids of the catalog achievements whose condition holds and that
/// are not in `already_earned`.
pub fn evaluate(ctx: &EvaluationContext, already_earned: &HashSet<String>) -> BTreeSet<AchievementId> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !already_earned.contains(a.id))
        .filter(|a| a.condition.is_satisfied(ctx))
        .map(|a| a.id)
        .collect()
}
