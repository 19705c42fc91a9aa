//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, TEST_PLAYER};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_get_player() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.get_player(TEST_PLAYER).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::TestServer;

/// Current unix time in seconds, as the server sees it.
#[allow(dead_code)]
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
