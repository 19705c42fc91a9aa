use super::achievements::AchievementId;
use super::models::{
    GameSessionRecord, LeaderboardEntry, Player, PlayerId, SessionId, UserAchievement,
    UserProfile, UserStats,
};
use anyhow::Result;

/// How a finished game lands in the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionWrite {
    /// Closes the open session with the record's id.
    Finish,
    /// Inserts the record as a new session, its id is ignored.
    Insert,
}

/// Everything a finished game changes for its player.
#[derive(Debug, Clone, Copy)]
pub struct FinishedSession<'a> {
    pub session: &'a GameSessionRecord,
    pub write: SessionWrite,
    pub stats: &'a UserStats,
    pub profile: &'a UserProfile,
    pub new_achievements: &'a [AchievementId],
    pub earned_at: i64,
}

pub trait PlayerStore: Send + Sync {
    /// Creates a new player with a fresh profile and returns the player id.
    /// Returns Err if the username, player name or email is already taken.
    fn create_player(
        &self,
        username: &str,
        player_name: &str,
        email: Option<&str>,
        created_at: i64,
    ) -> Result<PlayerId>;

    /// Returns the player with the given username.
    /// Returns Ok(None) if the player does not exist.
    /// Returns Err if there is a database error.
    fn get_player(&self, username: &str) -> Result<Option<Player>>;

    /// Returns true if any player already uses the given display name.
    fn is_player_name_taken(&self, player_name: &str) -> Result<bool>;

    /// Returns true if any player is registered with the given email.
    fn is_email_taken(&self, email: &str) -> Result<bool>;
}

pub trait GameSessionStore: Send + Sync {
    /// Creates an open session and returns its id.
    fn start_session(&self, player_id: PlayerId, started_at: i64) -> Result<SessionId>;

    /// Stores a finished game together with the player's recomputed stats,
    /// updated profile and newly earned achievements, all or nothing.
    /// Achievements are linked to the stored session and carry its score.
    /// Returns Ok(None) if the session to close was already finished, nothing
    /// is written then.
    fn commit_finished_session(&self, finished: &FinishedSession) -> Result<Option<SessionId>>;

    /// Returns Ok(None) if the session does not exist.
    fn get_session(&self, session_id: SessionId) -> Result<Option<GameSessionRecord>>;

    /// Returns all finished sessions of the player, in creation order.
    fn get_finished_sessions(&self, player_id: PlayerId) -> Result<Vec<GameSessionRecord>>;

    /// Returns the player's sessions, newest first.
    fn get_recent_sessions(
        &self,
        player_id: PlayerId,
        limit: usize,
    ) -> Result<Vec<GameSessionRecord>>;

    /// Returns the player's finished sessions, highest score first.
    fn get_best_sessions(&self, player_id: PlayerId, limit: usize)
        -> Result<Vec<GameSessionRecord>>;
}

pub trait UserStatsStore: Send + Sync {
    /// Returns Ok(None) if stats were never computed for the player.
    fn get_user_stats(&self, player_id: PlayerId) -> Result<Option<UserStats>>;
}

pub trait AchievementStore: Send + Sync {
    /// Returns the player's earned achievements, most recent first.
    fn get_earned_achievements(&self, player_id: PlayerId) -> Result<Vec<UserAchievement>>;
}

pub trait LeaderboardStore: Send + Sync {
    /// Best finished session of each player, ranked by score.
    /// Ties are broken by the earliest creation time.
    fn get_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;

    /// Best finished sessions overall, any number per player.
    fn get_top_sessions(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;
}

pub trait FullGameStore:
    PlayerStore + GameSessionStore + UserStatsStore + AchievementStore + LeaderboardStore
{
}

impl<T> FullGameStore for T where
    T: PlayerStore + GameSessionStore + UserStatsStore + AchievementStore + LeaderboardStore
{
}
