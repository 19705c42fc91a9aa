use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{error, info};

use crate::config::MAX_LEADERBOARD_SIZE;
use crate::game::{
    GameError, GameOutcomeBody, GuardedGameManager, PlayerRegistration, ScoreSubmission, SessionId,
};
use tower_http::services::ServeDir;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    pub error: String,
}

#[derive(Deserialize, Debug, Default)]
struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, config: &ServerConfig) -> usize {
        self.limit
            .unwrap_or(config.leaderboard_size)
            .min(MAX_LEADERBOARD_SIZE)
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match &self {
            GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GameError::PlayerNotFound(_) | GameError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            GameError::PlayerAlreadyExists(_) | GameError::SessionAlreadyFinished(_) => {
                StatusCode::CONFLICT
            }
            GameError::Store(err) => {
                error!("Store failure: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: match &self {
                GameError::Store(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    };
    Json(stats)
}

async fn register_player(
    State(game_manager): State<GuardedGameManager>,
    Json(registration): Json<PlayerRegistration>,
) -> Result<Response, GameError> {
    let player = game_manager.lock().unwrap().register_player(registration)?;
    Ok((StatusCode::CREATED, Json(player)).into_response())
}

async fn get_player(
    State(game_manager): State<GuardedGameManager>,
    Path(username): Path<String>,
) -> Result<Response, GameError> {
    let player = game_manager.lock().unwrap().get_player(&username)?;
    Ok(Json(player).into_response())
}

async fn get_player_stats(
    State(game_manager): State<GuardedGameManager>,
    Path(username): Path<String>,
) -> Result<Response, GameError> {
    let stats = game_manager.lock().unwrap().get_user_stats(&username)?;
    Ok(Json(stats).into_response())
}

async fn get_player_sessions(
    State(state): State<ServerState>,
    Path(username): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Response, GameError> {
    let limit = query.resolve(&state.config);
    let sessions = state
        .game_manager
        .lock()
        .unwrap()
        .get_recent_sessions(&username, limit)?;
    Ok(Json(sessions).into_response())
}

async fn get_player_best_sessions(
    State(state): State<ServerState>,
    Path(username): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Response, GameError> {
    let limit = query.resolve(&state.config);
    let sessions = state
        .game_manager
        .lock()
        .unwrap()
        .get_best_sessions(&username, limit)?;
    Ok(Json(sessions).into_response())
}

async fn start_session(
    State(game_manager): State<GuardedGameManager>,
    Path(username): Path<String>,
) -> Result<Response, GameError> {
    let session = game_manager.lock().unwrap().start_session(&username)?;
    Ok((StatusCode::CREATED, Json(session)).into_response())
}

async fn finish_session(
    State(game_manager): State<GuardedGameManager>,
    Path((username, session_id)): Path<(String, SessionId)>,
    Json(outcome): Json<GameOutcomeBody>,
) -> Result<Response, GameError> {
    let outcome = game_manager
        .lock()
        .unwrap()
        .finish_session(&username, session_id, outcome)?;
    Ok(Json(outcome).into_response())
}

async fn submit_score(
    State(game_manager): State<GuardedGameManager>,
    Path(username): Path<String>,
    Json(submission): Json<ScoreSubmission>,
) -> Result<Response, GameError> {
    let outcome = game_manager
        .lock()
        .unwrap()
        .submit_score(&username, submission)?;
    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

async fn get_player_achievements(
    State(game_manager): State<GuardedGameManager>,
    Path(username): Path<String>,
) -> Result<Response, GameError> {
    let achievements = game_manager
        .lock()
        .unwrap()
        .get_earned_achievements(&username)?;
    Ok(Json(achievements).into_response())
}

async fn get_achievement_catalog(State(game_manager): State<GuardedGameManager>) -> Response {
    let catalog = game_manager.lock().unwrap().get_achievement_catalog();
    Json(catalog).into_response()
}

async fn get_leaderboard(
    State(state): State<ServerState>,
    Query(query): Query<LimitQuery>,
) -> Result<Response, GameError> {
    let limit = query.resolve(&state.config);
    let leaderboard = state.game_manager.lock().unwrap().get_leaderboard(limit)?;
    Ok(Json(leaderboard).into_response())
}

async fn get_top_sessions(
    State(state): State<ServerState>,
    Query(query): Query<LimitQuery>,
) -> Result<Response, GameError> {
    let limit = query.resolve(&state.config);
    let sessions = state.game_manager.lock().unwrap().get_top_sessions(limit)?;
    Ok(Json(sessions).into_response())
}

pub fn make_app(config: ServerConfig, game_manager: GuardedGameManager) -> Result<Router> {
    let state = ServerState::new(config.clone(), game_manager);

    let player_routes: Router = Router::new()
        .route("/v1/players", post(register_player))
        .route("/v1/players/{username}", get(get_player))
        .route("/v1/players/{username}/stats", get(get_player_stats))
        .route(
            "/v1/players/{username}/sessions",
            get(get_player_sessions).post(start_session),
        )
        .route(
            "/v1/players/{username}/sessions/best",
            get(get_player_best_sessions),
        )
        .route(
            "/v1/players/{username}/sessions/{id}/finish",
            post(finish_session),
        )
        .route("/v1/players/{username}/scores", post(submit_score))
        .route(
            "/v1/players/{username}/achievements",
            get(get_player_achievements),
        )
        .with_state(state.clone());

    let global_routes: Router = Router::new()
        .route("/v1/achievements", get(get_achievement_catalog))
        .route("/v1/leaderboard", get(get_leaderboard))
        .route("/v1/leaderboard/sessions", get(get_top_sessions))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .merge(player_routes)
        .merge(global_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(config: ServerConfig, game_manager: GuardedGameManager) -> Result<()> {
    let port = config.port;
    let app = make_app(config, game_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
