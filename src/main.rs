use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tetris_stats_server::config::{AppConfig, CliConfig, FileConfig, DEFAULT_LEADERBOARD_SIZE};
use tetris_stats_server::{
    run_server, GameManager, RequestsLoggingLevel, ServerConfig, SqliteGameStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file, created if missing.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Default number of entries returned by leaderboard and history endpoints.
    #[clap(long, default_value_t = DEFAULT_LEADERBOARD_SIZE)]
    pub leaderboard_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        frontend_dir_path: cli_args.frontend_dir_path,
        leaderboard_size: cli_args.leaderboard_size,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite game database at {:?}...", config.db_path);
    let game_store = Arc::new(SqliteGameStore::new(&config.db_path)?);
    let game_manager = GameManager::new(game_store, config.leveling);

    info!(
        "Ready to serve at port {} (exp unit {}, score per exp {})",
        config.port, config.leveling.exp_unit, config.leveling.score_per_exp
    );
    run_server(
        ServerConfig {
            requests_logging_level: config.logging_level,
            port: config.port,
            frontend_dir_path: config.frontend_dir_path,
            leaderboard_size: config.leaderboard_size,
        },
        Arc::new(Mutex::new(game_manager)),
    )
    .await
}
