//! Tetris Stats Server Library
//!
//! Game sessions, player progression, achievements and leaderboards behind
//! an HTTP API. The modules are exposed for testing and potential reuse.

pub mod config;
pub mod game;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use game::{GameManager, GuardedGameManager, LevelingRules, SqliteGameStore};
pub use server::{run_server, RequestsLoggingLevel, ServerConfig};
