//! End-to-end tests for player endpoints
//!
//! Registration, profile progression and lifetime stats.

mod common;

use common::{TestClient, TestServer, OTHER_PLAYER_NAME, TEST_PLAYER, TEST_PLAYER_NAME};
use reqwest::StatusCode;

#[tokio::test]
async fn test_home_reports_uptime() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_home().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["uptime"].as_str().unwrap().starts_with("0d"));
}

#[tokio::test]
async fn test_register_player() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .register_player("newcomer", "New Comer", Some("new@example.com"))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "newcomer");
    assert_eq!(body["player_name"], "New Comer");
    assert_eq!(body["email"], "new@example.com");
    assert_eq!(body["level"], 1);
    assert_eq!(body["experience"], 0);
    assert_eq!(body["exp_needed_for_next_level"], 1000);
}

#[tokio::test]
async fn test_register_duplicates_conflict() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register_player(TEST_PLAYER, "Fresh Name", None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client.register_player("fresh", OTHER_PLAYER_NAME, None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    client
        .register_player("first", "First", Some("same@example.com"))
        .await;
    let response = client
        .register_player("second", "Second", Some("same@example.com"))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_invalid_names() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register_player("", "Nameless", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let long_name = "x".repeat(51);
    let response = client.register_player("longname", &long_name, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_player_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    assert_eq!(
        client.get_player("nobody").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.get_stats("nobody").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.get_achievements("nobody").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_stats_are_zeroed_before_first_game() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_stats(TEST_PLAYER).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stats: serde_json::Value = response.json().await.unwrap();
    assert_eq!(stats["total_games"], 0);
    assert_eq!(stats["average_score"], 0.0);
    assert!(stats["first_game_at"].is_null());
}

#[tokio::test]
async fn test_stats_follow_submitted_games() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for score in [1000, 5000, 2000] {
        let response = client.submit_simple_score(TEST_PLAYER, score, 60).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let stats: serde_json::Value = client.get_stats(TEST_PLAYER).await.json().await.unwrap();
    assert_eq!(stats["total_games"], 3);
    assert_eq!(stats["total_score"], 8000);
    assert_eq!(stats["highest_score"], 5000);
    assert_eq!(stats["average_score"], 2666.67);
    assert_eq!(stats["total_playtime_seconds"], 180);

    let profile: serde_json::Value = client.get_player(TEST_PLAYER).await.json().await.unwrap();
    assert_eq!(profile["player_name"], TEST_PLAYER_NAME);
    assert_eq!(profile["games_played"], 3);
    assert_eq!(profile["total_score"], 8000);
    assert_eq!(profile["highest_score"], 5000);
    assert_eq!(profile["experience"], 80);
    assert_eq!(profile["progress_percent"], 8.0);
}

#[tokio::test]
async fn test_big_score_levels_up() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.submit_simple_score(TEST_PLAYER, 150_000, 300).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["exp_gained"], 1500);
    assert_eq!(outcome["levels_gained"], 1);
    assert_eq!(outcome["profile"]["level"], 2);
    assert_eq!(outcome["profile"]["experience"], 500);

    let profile: serde_json::Value = client.get_player(TEST_PLAYER).await.json().await.unwrap();
    assert_eq!(profile["level"], 2);
    assert_eq!(profile["exp_needed_for_next_level"], 2000);
    assert_eq!(profile["progress_percent"], 25.0);
}
