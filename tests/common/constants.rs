//! Shared constants for end-to-end tests
//!
//! When the seeded test data changes, update only this file.
#![allow(dead_code)]

// ============================================================================
// Seeded Players
// ============================================================================

/// Username of the player registered on every test server
pub const TEST_PLAYER: &str = "testplayer";

/// Display name of the seeded player
pub const TEST_PLAYER_NAME: &str = "Test Player";

/// Username of a second seeded player
pub const OTHER_PLAYER: &str = "otherplayer";

/// Display name of the second seeded player
pub const OTHER_PLAYER_NAME: &str = "Other Player";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to answer on `/`
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout applied to every test request
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Delay between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
