use super::RequestsLoggingLevel;
use crate::config::DEFAULT_LEADERBOARD_SIZE;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Entries returned by list endpoints when no `limit` is given.
    pub leaderboard_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}
