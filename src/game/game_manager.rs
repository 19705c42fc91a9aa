use super::achievements::{
    self, find_achievement, AchievementId, EvaluationContext, ACHIEVEMENTS,
};
use super::error::GameError;
use super::game_store::{FinishedSession, FullGameStore, SessionWrite};
use super::leveling::LevelingRules;
use super::models::{
    AchievementEarned, EarnedAchievementView, GameOutcomeBody, GameSessionRecord,
    GameSessionView, LeaderboardEntry, Player, PlayerRegistration, PlayerView, ScoreSubmission,
    SessionId, SessionOutcome, UserProfile, UserStats,
};
use super::stats;
use anyhow::Context;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub type GuardedGameManager = Arc<Mutex<GameManager>>;

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct GameManager {
    store: Arc<dyn FullGameStore>,
    rules: LevelingRules,
    clock: fn() -> i64,
}

impl GameManager {
    pub fn new(store: Arc<dyn FullGameStore>, rules: LevelingRules) -> Self {
        Self::with_clock(store, rules, unix_now)
    }

    pub fn with_clock(store: Arc<dyn FullGameStore>, rules: LevelingRules, clock: fn() -> i64) -> Self {
        Self {
            store,
            rules,
            clock,
        }
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn require_player(&self, username: &str) -> Result<Player, GameError> {
        self.store
            .get_player(username)?
            .ok_or_else(|| GameError::PlayerNotFound(username.to_string()))
    }

    fn player_view(&self, player: Player) -> PlayerView {
        PlayerView {
            exp_needed_for_next_level: self.rules.exp_needed_for_level(player.profile.level),
            progress_percent: self.rules.progress_percent(&player.profile),
            id: player.id,
            username: player.username,
            player_name: player.player_name,
            email: player.email,
            created_at: player.created_at,
            profile: player.profile,
        }
    }

    pub fn register_player(&self, registration: PlayerRegistration) -> Result<PlayerView, GameError> {
        registration.validate()?;

        if self.store.get_player(&registration.username)?.is_some() {
            return Err(GameError::PlayerAlreadyExists(registration.username));
        }
        if self.store.is_player_name_taken(&registration.player_name)? {
            return Err(GameError::PlayerAlreadyExists(registration.player_name));
        }
        if let Some(email) = &registration.email {
            if self.store.is_email_taken(email)? {
                return Err(GameError::PlayerAlreadyExists(email.clone()));
            }
        }

        self.store.create_player(
            &registration.username,
            &registration.player_name,
            registration.email.as_deref(),
            self.now(),
        )?;
        info!("Registered player {}", registration.username);

        let player = self.require_player(&registration.username)?;
        Ok(self.player_view(player))
    }

    pub fn get_player(&self, username: &str) -> Result<PlayerView, GameError> {
        let player = self.require_player(username)?;
        Ok(self.player_view(player))
    }

    /// Stats are zeroed until the player finishes a first game.
    pub fn get_user_stats(&self, username: &str) -> Result<UserStats, GameError> {
        let player = self.require_player(username)?;
        Ok(self.store.get_user_stats(player.id)?.unwrap_or_default())
    }

    pub fn get_recent_sessions(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<GameSessionView>, GameError> {
        let player = self.require_player(username)?;
        let sessions = self.store.get_recent_sessions(player.id, limit)?;
        Ok(sessions.into_iter().map(GameSessionView::from).collect())
    }

    pub fn get_best_sessions(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<GameSessionView>, GameError> {
        let player = self.require_player(username)?;
        let sessions = self.store.get_best_sessions(player.id, limit)?;
        Ok(sessions.into_iter().map(GameSessionView::from).collect())
    }

    pub fn get_earned_achievements(
        &self,
        username: &str,
    ) -> Result<Vec<EarnedAchievementView>, GameError> {
        let player = self.require_player(username)?;
        let earned = self.store.get_earned_achievements(player.id)?;
        Ok(earned
            .into_iter()
            .filter_map(|earned| match find_achievement(&earned.achievement_id) {
                Some(achievement) => Some(EarnedAchievementView::new(earned, achievement)),
                None => {
                    warn!(
                        "Player {} has unknown achievement {}",
                        username, earned.achievement_id
                    );
                    None
                }
            })
            .collect())
    }

    pub fn get_achievement_catalog(&self) -> &'static [achievements::Achievement] {
        ACHIEVEMENTS
    }

    pub fn get_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, GameError> {
        Ok(self.store.get_leaderboard(limit)?)
    }

    pub fn get_top_sessions(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, GameError> {
        Ok(self.store.get_top_sessions(limit)?)
    }

    pub fn start_session(&self, username: &str) -> Result<GameSessionView, GameError> {
        let player = self.require_player(username)?;
        let session_id = self.store.start_session(player.id, self.now())?;
        debug!("Player {} started session {}", username, session_id);
        let session = self
            .store
            .get_session(session_id)?
            .ok_or(GameError::SessionNotFound(session_id))?;
        Ok(session.into())
    }

    /// Closes an open session with the given outcome and updates stats,
    /// profile and achievements.
    pub fn finish_session(
        &self,
        username: &str,
        session_id: SessionId,
        outcome: GameOutcomeBody,
    ) -> Result<SessionOutcome, GameError> {
        let outcome = outcome.validate()?;
        let player = self.require_player(username)?;

        let session = self
            .store
            .get_session(session_id)?
            .filter(|session| session.player_id == player.id)
            .ok_or(GameError::SessionNotFound(session_id))?;
        if session.is_finished() {
            return Err(GameError::SessionAlreadyFinished(session_id));
        }

        let ended_at = self.now().max(session.started_at);
        let session = session.finished_with(outcome, ended_at);
        self.process_finished_session(player, session, SessionWrite::Finish)
    }

    /// Records a game that was played entirely on the client.
    pub fn submit_score(
        &self,
        username: &str,
        submission: ScoreSubmission,
    ) -> Result<SessionOutcome, GameError> {
        let now = self.now();
        let (started_at, ended_at) = submission.resolve_timestamps(now)?;
        let outcome = submission.outcome.validate()?;
        let player = self.require_player(username)?;

        let session =
            GameSessionRecord::open(player.id, started_at, now).finished_with(outcome, ended_at);
        self.process_finished_session(player, session, SessionWrite::Insert)
    }

    /// Derives stats, profile and achievements for a finished game and
    /// stores them together with the session.
    fn process_finished_session(
        &self,
        player: Player,
        mut session: GameSessionRecord,
        write: SessionWrite,
    ) -> Result<SessionOutcome, GameError> {
        let mut sessions = self.store.get_finished_sessions(player.id)?;
        sessions.push(session.clone());
        let stats = stats::recompute(&sessions);

        let leveling = self.rules.apply_score_gain(&player.profile, session.score);
        let profile = reconcile_profile(&player.username, leveling.profile, &stats);

        let already_earned: HashSet<String> = self
            .store
            .get_earned_achievements(player.id)?
            .into_iter()
            .map(|a| a.achievement_id)
            .collect();
        let ctx = EvaluationContext {
            stats: &stats,
            profile: &profile,
            latest_session: Some(&session),
        };
        let new_ids: Vec<AchievementId> = achievements::evaluate(&ctx, &already_earned)
            .into_iter()
            .collect();

        let earned_at = self.now();
        let committed = self
            .store
            .commit_finished_session(&FinishedSession {
                session: &session,
                write,
                stats: &stats,
                profile: &profile,
                new_achievements: &new_ids,
                earned_at,
            })
            .with_context(|| format!("Failed to record game of player {}", player.username))?;
        session.id = committed.ok_or(GameError::SessionAlreadyFinished(session.id))?;

        if leveling.levels_gained > 0 {
            info!(
                "Player {} reached level {} (+{})",
                player.username, profile.level, leveling.levels_gained
            );
        }
        let new_achievements: Vec<AchievementEarned> = new_ids
            .into_iter()
            .filter_map(find_achievement)
            .map(|achievement| AchievementEarned {
                achievement,
                score_when_earned: session.score,
                earned_at,
            })
            .collect();
        for earned in &new_achievements {
            info!(
                "Player {} earned achievement {} ({:?})",
                player.username, earned.achievement.id, earned.achievement.rarity
            );
        }

        Ok(SessionOutcome {
            session: session.into(),
            stats,
            profile,
            exp_gained: leveling.exp_gained,
            levels_gained: leveling.levels_gained,
            new_achievements,
        })
    }
}

/// The recomputed stats are the source of truth for the profile counters.
fn reconcile_profile(username: &str, mut profile: UserProfile, stats: &UserStats) -> UserProfile {
    if profile.total_score != stats.total_score || profile.games_played != stats.total_games {
        warn!(
            "Profile of {} diverged from stats: total score {} vs {}, games {} vs {}",
            username,
            profile.total_score,
            stats.total_score,
            profile.games_played,
            stats.total_games
        );
    }
    profile.total_score = stats.total_score;
    profile.games_played = stats.total_games;
    profile.highest_score = stats.highest_score;
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::models::EndReason;
    use crate::game::SqliteGameStore;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    fn fixed_clock() -> i64 {
        NOW
    }

    fn create_tmp_manager() -> (GameManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteGameStore::new(temp_dir.path().join("test.db")).unwrap();
        let manager =
            GameManager::with_clock(Arc::new(store), LevelingRules::default(), fixed_clock);
        (manager, temp_dir)
    }

    fn register(manager: &GameManager, username: &str) {
        manager
            .register_player(PlayerRegistration {
                username: username.to_string(),
                player_name: username.to_uppercase(),
                email: None,
            })
            .unwrap();
    }

    fn submission(score: i64, duration: i64) -> ScoreSubmission {
        ScoreSubmission {
            outcome: GameOutcomeBody {
                score,
                final_level: 1,
                ..Default::default()
            },
            started_at: Some(NOW - duration),
            ended_at: Some(NOW),
        }
    }

    #[test]
    fn registers_player_once() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");

        let profile = manager.get_player("alice").unwrap();
        assert_eq!(profile.profile.level, 1);
        assert_eq!(profile.exp_needed_for_next_level, 1000);
        assert_eq!(profile.progress_percent, 0.0);

        let duplicate = manager.register_player(PlayerRegistration {
            username: "alice".to_string(),
            player_name: "Someone".to_string(),
            email: None,
        });
        assert!(matches!(duplicate, Err(GameError::PlayerAlreadyExists(_))));

        let same_name = manager.register_player(PlayerRegistration {
            username: "bob".to_string(),
            player_name: "ALICE".to_string(),
            email: None,
        });
        assert!(matches!(same_name, Err(GameError::PlayerAlreadyExists(_))));
    }

    #[test]
    fn unknown_player_is_not_found() {
        let (manager, _temp_dir) = create_tmp_manager();
        assert!(matches!(
            manager.get_user_stats("ghost"),
            Err(GameError::PlayerNotFound(_))
        ));
        assert!(matches!(
            manager.submit_score("ghost", submission(100, 10)),
            Err(GameError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn stats_are_zeroed_before_first_game() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");
        assert_eq!(manager.get_user_stats("alice").unwrap(), UserStats::default());
    }

    #[test]
    fn first_game_runs_the_whole_pipeline() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");

        let outcome = manager.submit_score("alice", submission(1500, 120)).unwrap();

        assert_eq!(outcome.session.duration_seconds, Some(120));
        assert_eq!(outcome.stats.total_games, 1);
        assert_eq!(outcome.stats.total_score, 1500);
        assert_eq!(outcome.exp_gained, 15);
        assert_eq!(outcome.levels_gained, 0);
        assert_eq!(outcome.profile.games_played, 1);
        assert_eq!(outcome.profile.highest_score, 1500);
        let ids: Vec<&str> = outcome.new_achievements.iter().map(|a| a.achievement.id).collect();
        assert_eq!(ids, vec!["century_club", "first_steps"]);

        let earned = manager.get_earned_achievements("alice").unwrap();
        assert_eq!(earned.len(), 2);
        assert_eq!(earned[0].session_id, Some(outcome.session.session.id));
        assert_eq!(earned[0].score_when_earned, Some(1500));

        let second = manager.submit_score("alice", submission(1200, 120)).unwrap();
        assert!(second.new_achievements.is_empty());
        assert_eq!(manager.get_earned_achievements("alice").unwrap().len(), 2);
    }

    #[test]
    fn level_up_from_big_score() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");

        let outcome = manager.submit_score("alice", submission(150_000, 300)).unwrap();

        assert_eq!(outcome.levels_gained, 1);
        assert_eq!(outcome.profile.level, 2);
        assert_eq!(outcome.profile.experience, 500);

        let profile = manager.get_player("alice").unwrap();
        assert_eq!(profile.profile.level, 2);
        assert_eq!(profile.exp_needed_for_next_level, 2000);
        assert_eq!(profile.progress_percent, 25.0);
    }

    #[test]
    fn session_lifecycle() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");
        register(&manager, "bob");

        let open = manager.start_session("alice").unwrap();
        let session_id = open.session.id;
        assert!(open.session.ended_at.is_none());
        assert_eq!(manager.get_user_stats("alice").unwrap().total_games, 0);

        let body = GameOutcomeBody {
            score: 700,
            final_level: 2,
            end_reason: EndReason::Completed,
            ..Default::default()
        };

        let stolen = manager.finish_session("bob", session_id, body.clone());
        assert!(matches!(stolen, Err(GameError::SessionNotFound(_))));

        let outcome = manager.finish_session("alice", session_id, body.clone()).unwrap();
        assert_eq!(outcome.session.session.ended_at, Some(NOW));
        assert_eq!(outcome.stats.games_won, 1);

        let again = manager.finish_session("alice", session_id, body);
        assert!(matches!(again, Err(GameError::SessionAlreadyFinished(_))));
        assert_eq!(manager.get_user_stats("alice").unwrap().total_games, 1);
    }

    #[test]
    fn rejects_invalid_submissions() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");

        let negative = manager.submit_score("alice", submission(-1, 10));
        assert!(matches!(negative, Err(GameError::InvalidInput(_))));

        let mut inverted = submission(100, 10);
        inverted.started_at = Some(NOW + 10);
        assert!(matches!(
            manager.submit_score("alice", inverted),
            Err(GameError::InvalidInput(_))
        ));
        assert!(manager.get_recent_sessions("alice", 10).unwrap().is_empty());
    }

    #[test]
    fn oversized_scores_are_rejected() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");

        let huge = manager.submit_score("alice", submission(i64::MAX, 10));
        assert!(matches!(huge, Err(GameError::InvalidInput(_))));
        assert!(manager.get_recent_sessions("alice", 10).unwrap().is_empty());
        assert_eq!(manager.get_user_stats("alice").unwrap(), UserStats::default());

        // The largest accepted score keeps accumulating
        let max_score = u32::MAX as i64;
        for _ in 0..3 {
            manager.submit_score("alice", submission(max_score, 10)).unwrap();
        }
        let stats = manager.get_user_stats("alice").unwrap();
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.total_score, 3 * u32::MAX as u64);
        assert_eq!(stats.highest_score, u32::MAX as u64);

        let player = manager.get_player("alice").unwrap();
        assert_eq!(player.profile.total_score, stats.total_score);
        assert_eq!(player.profile.games_played, 3);
        assert!(player.profile.experience < player.exp_needed_for_next_level);
    }

    fn reject_profile_writes(temp_dir: &TempDir, rejected: bool) {
        let conn = rusqlite::Connection::open(temp_dir.path().join("test.db")).unwrap();
        let sql = if rejected {
            "CREATE TRIGGER reject_profile_writes BEFORE UPDATE ON player \
             BEGIN SELECT RAISE(ABORT, 'profile writes rejected'); END;"
        } else {
            "DROP TRIGGER reject_profile_writes;"
        };
        conn.execute_batch(sql).unwrap();
    }

    #[test]
    fn failed_game_leaves_no_partial_writes() {
        let (manager, temp_dir) = create_tmp_manager();
        register(&manager, "alice");
        manager.submit_score("alice", submission(1500, 120)).unwrap();
        let session_id = manager.start_session("alice").unwrap().session.id;

        reject_profile_writes(&temp_dir, true);
        let body = GameOutcomeBody {
            score: 150_000,
            final_level: 1,
            ..Default::default()
        };
        let failed = manager.finish_session("alice", session_id, body.clone());
        assert!(matches!(failed, Err(GameError::Store(_))));
        let failed = manager.submit_score("alice", submission(2000, 60));
        assert!(matches!(failed, Err(GameError::Store(_))));

        let stats = manager.get_user_stats("alice").unwrap();
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_score, 1500);
        let player = manager.get_player("alice").unwrap();
        assert_eq!(player.profile.games_played, 1);
        assert_eq!(player.profile.total_score, 1500);
        let recent = manager.get_recent_sessions("alice", 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(!recent[0].session.is_finished());
        assert_eq!(manager.get_earned_achievements("alice").unwrap().len(), 2);

        // Nothing was finished, so the same game can be retried
        reject_profile_writes(&temp_dir, false);
        let outcome = manager.finish_session("alice", session_id, body).unwrap();
        assert_eq!(outcome.stats.total_games, 2);
        assert_eq!(outcome.profile.games_played, 2);
        assert_eq!(outcome.profile.level, 2);
        assert_eq!(outcome.profile.experience, 515);
        assert_eq!(manager.get_player("alice").unwrap().profile, outcome.profile);
    }

    #[test]
    fn leaderboard_shows_best_per_player() {
        let (manager, _temp_dir) = create_tmp_manager();
        register(&manager, "alice");
        register(&manager, "bob");

        manager.submit_score("alice", submission(3000, 60)).unwrap();
        manager.submit_score("alice", submission(9000, 60)).unwrap();
        manager.submit_score("bob", submission(4000, 60)).unwrap();

        let leaderboard = manager.get_leaderboard(10).unwrap();
        let scores: Vec<(&str, u64)> = leaderboard
            .iter()
            .map(|e| (e.username.as_str(), e.score))
            .collect();
        assert_eq!(scores, vec![("alice", 9000), ("bob", 4000)]);

        assert_eq!(manager.get_top_sessions(2).unwrap().len(), 2);
        let best = manager.get_best_sessions("alice", 10).unwrap();
        assert_eq!(best[0].session.score, 9000);
    }
}
