pub mod achievements;
mod error;
mod game_manager;
mod game_store;
pub mod leveling;
mod models;
mod sqlite_game_store;
pub mod stats;

pub use achievements::{Achievement, AchievementCondition, Rarity, ACHIEVEMENTS};
pub use error::GameError;
pub use game_manager::{GameManager, GuardedGameManager};
pub use game_store::{
    AchievementStore, FinishedSession, FullGameStore, GameSessionStore, LeaderboardStore,
    PlayerStore, SessionWrite, UserStatsStore,
};
pub use leveling::LevelingRules;
pub use models::*;
pub use sqlite_game_store::SqliteGameStore;
