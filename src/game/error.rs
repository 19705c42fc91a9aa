use thiserror::Error;

use super::models::SessionId;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Player already exists: {0}")]
    PlayerAlreadyExists(String),

    #[error("Game session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Game session {0} is already finished")]
    SessionAlreadyFinished(SessionId),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}
