use super::game_store::{
    AchievementStore, FinishedSession, GameSessionStore, LeaderboardStore, PlayerStore,
    SessionWrite, UserStatsStore,
};
use super::models::{
    derive_duration_seconds, GameSessionRecord, LeaderboardEntry, Player, PlayerId, SessionId,
    UserAchievement, UserProfile, UserStats,
};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::debug;

const PLAYER_FK: ForeignKey = ForeignKey {
    foreign_table: "player",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const GAME_SESSION_FK: ForeignKey = ForeignKey {
    foreign_table: "game_session",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::SetNull,
};

/// V 0
const PLAYER_TABLE_V_0: Table = Table {
    name: "player",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("player_name", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text, is_unique = true),
        sqlite_column!(
            "experience",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "level",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "total_score",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "games_played",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "highest_score",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_player_highest_score", "highest_score")],
    unique_constraints: &[],
};

const GAME_SESSION_TABLE_V_0: Table = Table {
    name: "game_session",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "player_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PLAYER_FK)
        ),
        sqlite_column!(
            "score",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "final_level",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "lines_cleared",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "pieces_placed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "tetrises_cleared",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "t_spins",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "max_combo",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("started_at", &SqlType::Integer, non_null = true),
        sqlite_column!("ended_at", &SqlType::Integer),
        sqlite_column!(
            "end_reason",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'top_out'")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_game_session_player", "player_id"),
        ("idx_game_session_score", "score"),
    ],
    unique_constraints: &[],
};

const USER_STATS_TABLE_V_0: Table = Table {
    name: "user_stats",
    columns: &[
        sqlite_column!(
            "player_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&PLAYER_FK)
        ),
        sqlite_column!("total_games", &SqlType::Integer, non_null = true),
        sqlite_column!("games_won", &SqlType::Integer, non_null = true),
        sqlite_column!("highest_score", &SqlType::Integer, non_null = true),
        sqlite_column!("highest_level", &SqlType::Integer, non_null = true),
        sqlite_column!("most_lines_cleared", &SqlType::Integer, non_null = true),
        sqlite_column!("longest_game_seconds", &SqlType::Integer, non_null = true),
        sqlite_column!("total_score", &SqlType::Integer, non_null = true),
        sqlite_column!("total_lines_cleared", &SqlType::Integer, non_null = true),
        sqlite_column!("total_pieces_placed", &SqlType::Integer, non_null = true),
        sqlite_column!("total_playtime_seconds", &SqlType::Integer, non_null = true),
        sqlite_column!("average_score", &SqlType::Real, non_null = true),
        sqlite_column!("average_lines_per_game", &SqlType::Real, non_null = true),
        sqlite_column!("first_game_at", &SqlType::Integer),
        sqlite_column!("last_game_at", &SqlType::Integer),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const USER_ACHIEVEMENT_TABLE_V_0: Table = Table {
    name: "user_achievement",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "player_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PLAYER_FK)
        ),
        sqlite_column!("achievement_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "game_session_id",
            &SqlType::Integer,
            foreign_key = Some(&GAME_SESSION_FK)
        ),
        sqlite_column!("earned_at", &SqlType::Integer, non_null = true),
        sqlite_column!("score_when_earned", &SqlType::Integer),
    ],
    indices: &[("idx_user_achievement_player", "player_id")],
    unique_constraints: &[&["player_id", "achievement_id"]],
};

/// V 1
const GAME_SESSION_TABLE_V_1: Table = Table {
    name: "game_session",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "player_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PLAYER_FK)
        ),
        sqlite_column!(
            "score",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "final_level",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "lines_cleared",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "pieces_placed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "tetrises_cleared",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "t_spins",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "max_combo",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("started_at", &SqlType::Integer, non_null = true),
        sqlite_column!("ended_at", &SqlType::Integer),
        sqlite_column!(
            "end_reason",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'top_out'")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "game_data",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'{}'")
        ),
    ],
    indices: &[
        ("idx_game_session_player", "player_id"),
        ("idx_game_session_score", "score"),
    ],
    unique_constraints: &[],
};

const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            PLAYER_TABLE_V_0,
            GAME_SESSION_TABLE_V_0,
            USER_STATS_TABLE_V_0,
            USER_ACHIEVEMENT_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            PLAYER_TABLE_V_0,
            GAME_SESSION_TABLE_V_1,
            USER_STATS_TABLE_V_0,
            USER_ACHIEVEMENT_TABLE_V_0,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute(
                "ALTER TABLE game_session ADD COLUMN game_data TEXT NOT NULL DEFAULT '{}'",
                [],
            )?;
            Ok(())
        }),
    },
];

const PLAYER_COLUMNS: &str = "id, username, player_name, email, created, \
    experience, level, total_score, games_played, highest_score";

const SESSION_COLUMNS: &str = "id, player_id, score, final_level, lines_cleared, \
    pieces_placed, tetrises_cleared, t_spins, max_combo, started_at, ended_at, \
    end_reason, game_data, created";

fn player_from_row(row: &Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        username: row.get(1)?,
        player_name: row.get(2)?,
        email: row.get(3)?,
        created_at: row.get(4)?,
        profile: UserProfile {
            experience: row.get(5)?,
            level: row.get(6)?,
            total_score: row.get(7)?,
            games_played: row.get(8)?,
            highest_score: row.get(9)?,
        },
    })
}

fn session_from_row(row: &Row) -> rusqlite::Result<GameSessionRecord> {
    let raw_game_data: String = row.get(12)?;
    let game_data = serde_json::from_str(&raw_game_data)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e)))?;
    Ok(GameSessionRecord {
        id: row.get(0)?,
        player_id: row.get(1)?,
        score: row.get(2)?,
        final_level: row.get(3)?,
        lines_cleared: row.get(4)?,
        pieces_placed: row.get(5)?,
        tetrises_cleared: row.get(6)?,
        t_spins: row.get(7)?,
        max_combo: row.get(8)?,
        started_at: row.get(9)?,
        ended_at: row.get(10)?,
        end_reason: row.get(11)?,
        game_data,
        created_at: row.get(13)?,
    })
}

fn leaderboard_entry_from_row(row: &Row) -> rusqlite::Result<LeaderboardEntry> {
    let started_at: i64 = row.get(6)?;
    let ended_at: Option<i64> = row.get(7)?;
    Ok(LeaderboardEntry {
        session_id: row.get(0)?,
        username: row.get(1)?,
        player_name: row.get(2)?,
        score: row.get(3)?,
        final_level: row.get(4)?,
        lines_cleared: row.get(5)?,
        duration_seconds: derive_duration_seconds(started_at, ended_at),
        created_at: row.get(8)?,
        rank: row.get(9)?,
    })
}

fn insert_finished_session(conn: &Connection, session: &GameSessionRecord) -> Result<SessionId> {
    let ended_at = session
        .ended_at
        .context("Cannot store a session without an end time")?;
    conn.execute(
        "INSERT INTO game_session (player_id, score, final_level, lines_cleared, \
         pieces_placed, tetrises_cleared, t_spins, max_combo, started_at, ended_at, \
         end_reason, game_data, created) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            session.player_id,
            session.score,
            session.final_level,
            session.lines_cleared,
            session.pieces_placed,
            session.tetrises_cleared,
            session.t_spins,
            session.max_combo,
            session.started_at,
            ended_at,
            session.end_reason,
            session.game_data.to_string(),
            session.created_at
        ],
    )
    .with_context(|| format!("Failed to store session for player {}", session.player_id))?;
    Ok(conn.last_insert_rowid() as SessionId)
}

/// Returns false if the session was not open anymore.
fn close_session(conn: &Connection, session: &GameSessionRecord) -> Result<bool> {
    let ended_at = session
        .ended_at
        .context("Cannot close a session without an end time")?;
    let updated = conn
        .execute(
            "UPDATE game_session SET score = ?1, final_level = ?2, lines_cleared = ?3, \
             pieces_placed = ?4, tetrises_cleared = ?5, t_spins = ?6, max_combo = ?7, \
             end_reason = ?8, game_data = ?9, ended_at = ?10 \
             WHERE id = ?11 AND ended_at IS NULL",
            params![
                session.score,
                session.final_level,
                session.lines_cleared,
                session.pieces_placed,
                session.tetrises_cleared,
                session.t_spins,
                session.max_combo,
                session.end_reason,
                session.game_data.to_string(),
                ended_at,
                session.id
            ],
        )
        .with_context(|| format!("Failed to finish session {}", session.id))?;
    Ok(updated == 1)
}

fn replace_user_stats(conn: &Connection, player_id: PlayerId, stats: &UserStats) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO user_stats (player_id, total_games, games_won, \
         highest_score, highest_level, most_lines_cleared, longest_game_seconds, \
         total_score, total_lines_cleared, total_pieces_placed, total_playtime_seconds, \
         average_score, average_lines_per_game, first_game_at, last_game_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            player_id,
            stats.total_games,
            stats.games_won,
            stats.highest_score,
            stats.highest_level,
            stats.most_lines_cleared,
            stats.longest_game_seconds,
            stats.total_score,
            stats.total_lines_cleared,
            stats.total_pieces_placed,
            stats.total_playtime_seconds,
            stats.average_score,
            stats.average_lines_per_game,
            stats.first_game_at,
            stats.last_game_at
        ],
    )
    .with_context(|| format!("Failed to store stats of player {}", player_id))?;
    Ok(())
}

fn update_profile(conn: &Connection, player_id: PlayerId, profile: &UserProfile) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE player SET experience = ?1, level = ?2, total_score = ?3, \
             games_played = ?4, highest_score = ?5 WHERE id = ?6",
            params![
                profile.experience,
                profile.level,
                profile.total_score,
                profile.games_played,
                profile.highest_score,
                player_id
            ],
        )
        .with_context(|| format!("Failed to update profile of player {}", player_id))?;
    if updated == 0 {
        bail!("Player {} not found", player_id);
    }
    Ok(())
}

fn insert_achievement(conn: &Connection, achievement: &UserAchievement) -> Result<()> {
    conn.execute(
        "INSERT INTO user_achievement \
         (player_id, achievement_id, game_session_id, earned_at, score_when_earned) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            achievement.player_id,
            achievement.achievement_id,
            achievement.session_id,
            achievement.earned_at,
            achievement.score_when_earned
        ],
    )
    .with_context(|| {
        format!(
            "Failed to store achievement {} for player {}",
            achievement.achievement_id, achievement.player_id
        )
    })?;
    Ok(())
}

#[derive(Clone)]
pub struct SqliteGameStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGameStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteGameStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_sessions(
        &self,
        where_and_order: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<GameSessionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM game_session {}",
            SESSION_COLUMNS, where_and_order
        ))?;
        let sessions = stmt
            .query_map(params, session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }
}

impl PlayerStore for SqliteGameStore {
    fn create_player(
        &self,
        username: &str,
        player_name: &str,
        email: Option<&str>,
        created_at: i64,
    ) -> Result<PlayerId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO player (username, player_name, email, created) VALUES (?1, ?2, ?3, ?4)",
            params![username, player_name, email, created_at],
        )
        .with_context(|| format!("Failed to create player {}", username))?;
        Ok(conn.last_insert_rowid() as PlayerId)
    }

    fn get_player(&self, username: &str) -> Result<Option<Player>> {
        let conn = self.conn.lock().unwrap();
        let player = conn
            .query_row(
                &format!("SELECT {} FROM player WHERE username = ?1", PLAYER_COLUMNS),
                params![username],
                player_from_row,
            )
            .optional()?;
        Ok(player)
    }

    fn is_player_name_taken(&self, player_name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM player WHERE player_name = ?1",
            params![player_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn is_email_taken(&self, email: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM player WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl GameSessionStore for SqliteGameStore {
    fn start_session(&self, player_id: PlayerId, started_at: i64) -> Result<SessionId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO game_session (player_id, started_at, created) VALUES (?1, ?2, ?2)",
            params![player_id, started_at],
        )
        .with_context(|| format!("Failed to start session for player {}", player_id))?;
        Ok(conn.last_insert_rowid() as SessionId)
    }

    fn commit_finished_session(&self, finished: &FinishedSession) -> Result<Option<SessionId>> {
        let session = finished.session;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let session_id = match finished.write {
            SessionWrite::Finish => {
                if !close_session(&tx, session)? {
                    debug!("Session {} is already finished", session.id);
                    return Ok(None);
                }
                session.id
            }
            SessionWrite::Insert => insert_finished_session(&tx, session)?,
        };
        replace_user_stats(&tx, session.player_id, finished.stats)?;
        update_profile(&tx, session.player_id, finished.profile)?;
        for achievement_id in finished.new_achievements {
            insert_achievement(
                &tx,
                &UserAchievement {
                    player_id: session.player_id,
                    achievement_id: achievement_id.to_string(),
                    session_id: Some(session_id),
                    earned_at: finished.earned_at,
                    score_when_earned: Some(session.score),
                },
            )?;
        }

        tx.commit()?;
        Ok(Some(session_id))
    }

    fn get_session(&self, session_id: SessionId) -> Result<Option<GameSessionRecord>> {
        let conn = self.conn.lock().unwrap();
        let session = conn
            .query_row(
                &format!("SELECT {} FROM game_session WHERE id = ?1", SESSION_COLUMNS),
                params![session_id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn get_finished_sessions(&self, player_id: PlayerId) -> Result<Vec<GameSessionRecord>> {
        self.query_sessions(
            "WHERE player_id = ?1 AND ended_at IS NOT NULL ORDER BY created ASC, id ASC",
            params![player_id],
        )
    }

    fn get_recent_sessions(
        &self,
        player_id: PlayerId,
        limit: usize,
    ) -> Result<Vec<GameSessionRecord>> {
        self.query_sessions(
            "WHERE player_id = ?1 ORDER BY created DESC, id DESC LIMIT ?2",
            params![player_id, limit],
        )
    }

    fn get_best_sessions(
        &self,
        player_id: PlayerId,
        limit: usize,
    ) -> Result<Vec<GameSessionRecord>> {
        self.query_sessions(
            "WHERE player_id = ?1 AND ended_at IS NOT NULL \
             ORDER BY score DESC, created ASC, id ASC LIMIT ?2",
            params![player_id, limit],
        )
    }
}

impl UserStatsStore for SqliteGameStore {
    fn get_user_stats(&self, player_id: PlayerId) -> Result<Option<UserStats>> {
        let conn = self.conn.lock().unwrap();
        let stats = conn
            .query_row(
                "SELECT total_games, games_won, highest_score, highest_level, \
                 most_lines_cleared, longest_game_seconds, total_score, total_lines_cleared, \
                 total_pieces_placed, total_playtime_seconds, average_score, \
                 average_lines_per_game, first_game_at, last_game_at \
                 FROM user_stats WHERE player_id = ?1",
                params![player_id],
                |row| {
                    Ok(UserStats {
                        total_games: row.get(0)?,
                        games_won: row.get(1)?,
                        highest_score: row.get(2)?,
                        highest_level: row.get(3)?,
                        most_lines_cleared: row.get(4)?,
                        longest_game_seconds: row.get(5)?,
                        total_score: row.get(6)?,
                        total_lines_cleared: row.get(7)?,
                        total_pieces_placed: row.get(8)?,
                        total_playtime_seconds: row.get(9)?,
                        average_score: row.get(10)?,
                        average_lines_per_game: row.get(11)?,
                        first_game_at: row.get(12)?,
                        last_game_at: row.get(13)?,
                    })
                },
            )
            .optional()?;
        Ok(stats)
    }
}

impl AchievementStore for SqliteGameStore {
    fn get_earned_achievements(&self, player_id: PlayerId) -> Result<Vec<UserAchievement>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT player_id, achievement_id, game_session_id, earned_at, score_when_earned \
             FROM user_achievement WHERE player_id = ?1 ORDER BY earned_at DESC, id DESC",
        )?;
        let achievements = stmt
            .query_map(params![player_id], |row| {
                Ok(UserAchievement {
                    player_id: row.get(0)?,
                    achievement_id: row.get(1)?,
                    session_id: row.get(2)?,
                    earned_at: row.get(3)?,
                    score_when_earned: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(achievements)
    }
}

impl LeaderboardStore for SqliteGameStore {
    fn get_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT session_id, username, player_name, score, final_level, lines_cleared, \
             started_at, ended_at, created, \
             RANK() OVER (ORDER BY score DESC) AS leaderboard_rank \
             FROM ( \
                SELECT s.id AS session_id, p.username, p.player_name, s.score, s.final_level, \
                s.lines_cleared, s.started_at, s.ended_at, s.created, \
                ROW_NUMBER() OVER ( \
                    PARTITION BY s.player_id ORDER BY s.score DESC, s.created ASC, s.id ASC \
                ) AS player_position \
                FROM game_session s JOIN player p ON p.id = s.player_id \
                WHERE s.ended_at IS NOT NULL \
             ) \
             WHERE player_position = 1 \
             ORDER BY score DESC, created ASC, session_id ASC \
             LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], leaderboard_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn get_top_sessions(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT s.id, p.username, p.player_name, s.score, s.final_level, s.lines_cleared, \
             s.started_at, s.ended_at, s.created, \
             RANK() OVER (ORDER BY s.score DESC) AS leaderboard_rank \
             FROM game_session s JOIN player p ON p.id = s.player_id \
             WHERE s.ended_at IS NOT NULL \
             ORDER BY s.score DESC, s.created ASC, s.id ASC \
             LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], leaderboard_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
