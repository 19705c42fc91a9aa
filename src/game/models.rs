//! Game data models

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::achievements::{Achievement, Rarity};
use super::error::GameError;

pub type PlayerId = usize;
pub type SessionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    #[default]
    TopOut,
    Quit,
    Completed,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::TopOut => "top_out",
            EndReason::Quit => "quit",
            EndReason::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EndReason::TopOut => "Topped Out",
            EndReason::Quit => "Player Quit",
            EndReason::Completed => "Completed",
        }
    }
}

impl ToSql for EndReason {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EndReason {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "top_out" => Ok(EndReason::TopOut),
            "quit" => Ok(EndReason::Quit),
            "completed" => Ok(EndReason::Completed),
            other => Err(FromSqlError::Other(
                format!("Unknown end reason {}", other).into(),
            )),
        }
    }
}

/// One played game. Open while `ended_at` is `None`, immutable once finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSessionRecord {
    pub id: SessionId,
    pub player_id: PlayerId,
    pub score: u64,
    pub final_level: u32,
    pub lines_cleared: u32,
    pub pieces_placed: u32,
    /// Number of 4-line clears
    pub tetrises_cleared: u32,
    pub t_spins: u32,
    pub max_combo: u32,
    /// Unix timestamp when the game started
    pub started_at: i64,
    /// Unix timestamp when the game ended, None while it is still running
    pub ended_at: Option<i64>,
    pub end_reason: EndReason,
    /// Free-form client data, stored as is
    pub game_data: serde_json::Value,
    /// Unix timestamp when the record was created
    pub created_at: i64,
}

impl GameSessionRecord {
    /// A session that has not been stored yet. The id is assigned on insert.
    pub fn open(player_id: PlayerId, started_at: i64, created_at: i64) -> Self {
        GameSessionRecord {
            id: 0,
            player_id,
            score: 0,
            final_level: 1,
            lines_cleared: 0,
            pieces_placed: 0,
            tetrises_cleared: 0,
            t_spins: 0,
            max_combo: 0,
            started_at,
            ended_at: None,
            end_reason: EndReason::default(),
            game_data: serde_json::Value::Object(Default::default()),
            created_at,
        }
    }

    /// Closes the session with the given outcome.
    pub fn finished_with(self, outcome: GameOutcome, ended_at: i64) -> Self {
        GameSessionRecord {
            score: outcome.score,
            final_level: outcome.final_level,
            lines_cleared: outcome.lines_cleared,
            pieces_placed: outcome.pieces_placed,
            tetrises_cleared: outcome.tetrises_cleared,
            t_spins: outcome.t_spins,
            max_combo: outcome.max_combo,
            end_reason: outcome.end_reason,
            game_data: outcome.game_data,
            ended_at: Some(ended_at),
            ..self
        }
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Always derived from the start/end timestamps, there is no way to set it.
    pub fn duration_seconds(&self) -> Option<u64> {
        derive_duration_seconds(self.started_at, self.ended_at)
    }

    /// `MM:SS`, or `00:00` when the duration is unknown or zero.
    pub fn duration_formatted(&self) -> String {
        match self.duration_seconds() {
            Some(secs) if secs > 0 => format!("{:02}:{:02}", secs / 60, secs % 60),
            _ => "00:00".to_string(),
        }
    }

    pub fn lines_per_minute(&self) -> f64 {
        match self.duration_seconds() {
            Some(secs) if secs > 0 => round_to(self.lines_cleared as f64 * 60.0 / secs as f64, 1),
            _ => 0.0,
        }
    }

    pub fn pieces_per_second(&self) -> f64 {
        match self.duration_seconds() {
            Some(secs) if secs > 0 => round_to(self.pieces_placed as f64 / secs as f64, 2),
            _ => 0.0,
        }
    }
}

pub(crate) fn derive_duration_seconds(started_at: i64, ended_at: Option<i64>) -> Option<u64> {
    ended_at.map(|ended_at| (ended_at - started_at).max(0) as u64)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Session as returned by the API, with the derived read-only fields.
#[derive(Debug, Clone, Serialize)]
pub struct GameSessionView {
    #[serde(flatten)]
    pub session: GameSessionRecord,
    pub duration_seconds: Option<u64>,
    pub duration_formatted: String,
    pub lines_per_minute: f64,
    pub pieces_per_second: f64,
    pub end_reason_display: &'static str,
}

impl From<GameSessionRecord> for GameSessionView {
    fn from(session: GameSessionRecord) -> Self {
        GameSessionView {
            duration_seconds: session.duration_seconds(),
            duration_formatted: session.duration_formatted(),
            lines_per_minute: session.lines_per_minute(),
            pieces_per_second: session.pieces_per_second(),
            end_reason_display: session.end_reason.display_name(),
            session,
        }
    }
}

fn default_final_level() -> i64 {
    1
}

/// Raw result of a game as sent by a client. Signed on purpose so that
/// negative values reach validation instead of failing deserialization.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct GameOutcomeBody {
    pub score: i64,
    #[serde(default = "default_final_level")]
    pub final_level: i64,
    #[serde(default)]
    pub lines_cleared: i64,
    #[serde(default)]
    pub pieces_placed: i64,
    #[serde(default)]
    pub tetrises_cleared: i64,
    #[serde(default)]
    pub t_spins: i64,
    #[serde(default)]
    pub max_combo: i64,
    #[serde(default)]
    pub end_reason: EndReason,
    #[serde(default)]
    pub game_data: Option<serde_json::Value>,
}

/// Validated result of a game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub score: u64,
    pub final_level: u32,
    pub lines_cleared: u32,
    pub pieces_placed: u32,
    pub tetrises_cleared: u32,
    pub t_spins: u32,
    pub max_combo: u32,
    pub end_reason: EndReason,
    pub game_data: serde_json::Value,
}

fn non_negative_u32(field: &str, value: i64) -> Result<u32, GameError> {
    if value < 0 {
        return Err(GameError::InvalidInput(format!(
            "{} must be non-negative, got {}",
            field, value
        )));
    }
    u32::try_from(value)
        .map_err(|_| GameError::InvalidInput(format!("{} is too large: {}", field, value)))
}

impl GameOutcomeBody {
    pub fn validate(self) -> Result<GameOutcome, GameError> {
        let score = non_negative_u32("score", self.score)?;
        let final_level = non_negative_u32("final_level", self.final_level)?;
        if final_level == 0 {
            return Err(GameError::InvalidInput(
                "final_level must be at least 1".to_string(),
            ));
        }
        let game_data = match self.game_data {
            None | Some(serde_json::Value::Null) => serde_json::Value::Object(Default::default()),
            Some(data) => data,
        };

        Ok(GameOutcome {
            score: score as u64,
            final_level,
            lines_cleared: non_negative_u32("lines_cleared", self.lines_cleared)?,
            pieces_placed: non_negative_u32("pieces_placed", self.pieces_placed)?,
            tetrises_cleared: non_negative_u32("tetrises_cleared", self.tetrises_cleared)?,
            t_spins: non_negative_u32("t_spins", self.t_spins)?,
            max_combo: non_negative_u32("max_combo", self.max_combo)?,
            end_reason: self.end_reason,
            game_data,
        })
    }
}

/// One-shot submission of an already finished game.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScoreSubmission {
    #[serde(flatten)]
    pub outcome: GameOutcomeBody,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
}

impl ScoreSubmission {
    /// Resolves the session time span, missing ends default to `now`.
    pub fn resolve_timestamps(&self, now: i64) -> Result<(i64, i64), GameError> {
        let ended_at = self.ended_at.unwrap_or(now);
        let started_at = self.started_at.unwrap_or(ended_at);
        if started_at < 0 || ended_at < 0 {
            return Err(GameError::InvalidInput(
                "timestamps must be non-negative unix seconds".to_string(),
            ));
        }
        if ended_at < started_at {
            return Err(GameError::InvalidInput(format!(
                "ended_at ({}) is before started_at ({})",
                ended_at, started_at
            )));
        }
        if ended_at > now {
            return Err(GameError::InvalidInput(format!(
                "ended_at ({}) is in the future",
                ended_at
            )));
        }
        Ok((started_at, ended_at))
    }
}

/// Lifetime statistics of a player, always recomputed from the full session set.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct UserStats {
    pub total_games: u64,
    /// Games that ended with [EndReason::Completed]
    pub games_won: u64,

    pub highest_score: u64,
    pub highest_level: u32,
    pub most_lines_cleared: u32,
    pub longest_game_seconds: u64,

    pub total_score: u64,
    pub total_lines_cleared: u64,
    pub total_pieces_placed: u64,
    pub total_playtime_seconds: u64,

    pub average_score: f64,
    pub average_lines_per_game: f64,

    pub first_game_at: Option<i64>,
    pub last_game_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub experience: u64,
    pub level: u32,
    pub total_score: u64,
    pub games_played: u64,
    pub highest_score: u64,
}

impl Default for UserProfile {
    fn default() -> Self {
        UserProfile {
            experience: 0,
            level: 1,
            total_score: 0,
            games_played: 0,
            highest_score: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub player_name: String,
    pub email: Option<String>,
    pub created_at: i64,
    pub profile: UserProfile,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlayerRegistration {
    pub username: String,
    pub player_name: String,
    pub email: Option<String>,
}

pub const MAX_PLAYER_NAME_LENGTH: usize = 50;

impl PlayerRegistration {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.username.trim().is_empty() {
            return Err(GameError::InvalidInput(
                "username cannot be empty".to_string(),
            ));
        }
        if self.player_name.trim().is_empty() {
            return Err(GameError::InvalidInput(
                "player_name cannot be empty".to_string(),
            ));
        }
        if self.player_name.chars().count() > MAX_PLAYER_NAME_LENGTH {
            return Err(GameError::InvalidInput(format!(
                "player_name cannot be longer than {} characters",
                MAX_PLAYER_NAME_LENGTH
            )));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(GameError::InvalidInput(format!(
                    "invalid email address: {}",
                    email
                )));
            }
        }
        Ok(())
    }
}

/// Player profile as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub username: String,
    pub player_name: String,
    pub email: Option<String>,
    pub created_at: i64,
    #[serde(flatten)]
    pub profile: UserProfile,
    pub exp_needed_for_next_level: u64,
    pub progress_percent: f64,
}

/// An achievement a player has earned. At most one per (player, achievement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAchievement {
    pub player_id: PlayerId,
    pub achievement_id: String,
    pub session_id: Option<SessionId>,
    pub earned_at: i64,
    pub score_when_earned: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EarnedAchievementView {
    pub achievement_id: String,
    pub achievement_name: &'static str,
    pub achievement_icon: &'static str,
    pub rarity: Rarity,
    pub session_id: Option<SessionId>,
    pub earned_at: i64,
    pub score_when_earned: Option<u64>,
}

impl EarnedAchievementView {
    pub fn new(earned: UserAchievement, achievement: &'static Achievement) -> Self {
        EarnedAchievementView {
            achievement_id: earned.achievement_id,
            achievement_name: achievement.name,
            achievement_icon: achievement.icon,
            rarity: achievement.rarity,
            session_id: earned.session_id,
            earned_at: earned.earned_at,
            score_when_earned: earned.score_when_earned,
        }
    }
}

/// Emitted once for every achievement unlocked by a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementEarned {
    #[serde(flatten)]
    pub achievement: &'static Achievement,
    pub score_when_earned: u64,
    pub earned_at: i64,
}

/// Everything that changed because a session was finished.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub session: GameSessionView,
    pub stats: UserStats,
    pub profile: UserProfile,
    pub exp_gained: u64,
    pub levels_gained: u32,
    pub new_achievements: Vec<AchievementEarned>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub session_id: SessionId,
    pub username: String,
    pub player_name: String,
    pub score: u64,
    pub final_level: u32,
    pub lines_cleared: u32,
    pub duration_seconds: Option<u64>,
    pub created_at: i64,
}
