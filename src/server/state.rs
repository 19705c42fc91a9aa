use axum::extract::FromRef;

use crate::game::GuardedGameManager;
use std::time::Instant;

use super::ServerConfig;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub game_manager: GuardedGameManager,
}

impl ServerState {
    pub fn new(config: ServerConfig, game_manager: GuardedGameManager) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            game_manager,
        }
    }
}

impl FromRef<ServerState> for GuardedGameManager {
    fn from_ref(input: &ServerState) -> Self {
        input.game_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
