//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint.
//! When API routes or request formats change, update only this file.
#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Response {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };
        request.send().await.expect("Request failed")
    }

    fn limit_query(limit: Option<usize>) -> String {
        match limit {
            Some(limit) => format!("?limit={}", limit),
            None => String::new(),
        }
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// POST /v1/players
    pub async fn register_player(
        &self,
        username: &str,
        player_name: &str,
        email: Option<&str>,
    ) -> Response {
        self.post(
            "/v1/players",
            Some(json!({
                "username": username,
                "player_name": player_name,
                "email": email,
            })),
        )
        .await
    }

    /// GET /v1/players/{username}
    pub async fn get_player(&self, username: &str) -> Response {
        self.get(&format!("/v1/players/{}", username)).await
    }

    /// GET /v1/players/{username}/stats
    pub async fn get_stats(&self, username: &str) -> Response {
        self.get(&format!("/v1/players/{}/stats", username)).await
    }

    /// GET /v1/players/{username}/achievements
    pub async fn get_achievements(&self, username: &str) -> Response {
        self.get(&format!("/v1/players/{}/achievements", username))
            .await
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// GET /v1/players/{username}/sessions
    pub async fn get_sessions(&self, username: &str, limit: Option<usize>) -> Response {
        self.get(&format!(
            "/v1/players/{}/sessions{}",
            username,
            Self::limit_query(limit)
        ))
        .await
    }

    /// GET /v1/players/{username}/sessions/best
    pub async fn get_best_sessions(&self, username: &str, limit: Option<usize>) -> Response {
        self.get(&format!(
            "/v1/players/{}/sessions/best{}",
            username,
            Self::limit_query(limit)
        ))
        .await
    }

    /// POST /v1/players/{username}/sessions
    pub async fn start_session(&self, username: &str) -> Response {
        self.post(&format!("/v1/players/{}/sessions", username), None)
            .await
    }

    /// POST /v1/players/{username}/sessions/{id}/finish
    pub async fn finish_session(&self, username: &str, session_id: u64, outcome: Value) -> Response {
        self.post(
            &format!("/v1/players/{}/sessions/{}/finish", username, session_id),
            Some(outcome),
        )
        .await
    }

    /// POST /v1/players/{username}/scores
    pub async fn submit_score(&self, username: &str, submission: Value) -> Response {
        self.post(&format!("/v1/players/{}/scores", username), Some(submission))
            .await
    }

    /// Submits a finished game with the given score that lasted `duration_secs`.
    pub async fn submit_simple_score(&self, username: &str, score: u64, duration_secs: i64) -> Response {
        self.submit_score(
            username,
            json!({
                "score": score,
                "started_at": super::unix_now() - duration_secs,
            }),
        )
        .await
    }

    // ========================================================================
    // Global
    // ========================================================================

    /// GET /v1/achievements
    pub async fn get_achievement_catalog(&self) -> Response {
        self.get("/v1/achievements").await
    }

    /// GET /v1/leaderboard
    pub async fn get_leaderboard(&self, limit: Option<usize>) -> Response {
        self.get(&format!("/v1/leaderboard{}", Self::limit_query(limit)))
            .await
    }

    /// GET /v1/leaderboard/sessions
    pub async fn get_top_sessions(&self, limit: Option<usize>) -> Response {
        self.get(&format!(
            "/v1/leaderboard/sessions{}",
            Self::limit_query(limit)
        ))
        .await
    }
}
