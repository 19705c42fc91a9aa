mod file_config;

pub use file_config::{FileConfig, LevelingConfig};

use crate::game::LevelingRules;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
pub const MAX_LEADERBOARD_SIZE: usize = 100;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub leaderboard_size: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub leaderboard_size: usize,
    pub leveling: LevelingRules,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let leaderboard_size = file.leaderboard_size.unwrap_or(cli.leaderboard_size);
        if leaderboard_size == 0 || leaderboard_size > MAX_LEADERBOARD_SIZE {
            bail!(
                "leaderboard_size must be between 1 and {}, got {}",
                MAX_LEADERBOARD_SIZE,
                leaderboard_size
            );
        }

        let leveling_file = file.leveling.unwrap_or_default();
        let defaults = LevelingRules::default();
        let leveling = LevelingRules {
            exp_unit: leveling_file.exp_unit.unwrap_or(defaults.exp_unit),
            score_per_exp: leveling_file.score_per_exp.unwrap_or(defaults.score_per_exp),
        };
        if leveling.exp_unit == 0 || leveling.score_per_exp == 0 {
            bail!("leveling exp_unit and score_per_exp must be positive");
        }

        Ok(Self {
            db_path,
            port,
            logging_level,
            frontend_dir_path,
            leaderboard_size,
            leveling,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
