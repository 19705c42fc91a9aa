//! Lifetime statistics aggregation.

use super::models::{round_to, EndReason, GameSessionRecord, UserStats};

/// Recomputes a player's statistics from scratch over the given sessions.
///
/// Sessions that have not ended are skipped. The result only depends on the
/// set of finished sessions, so running it twice over the same input yields
/// identical stats.
pub fn recompute(sessions: &[GameSessionRecord]) -> UserStats {
    let mut stats = UserStats::default();

    for session in sessions.iter().filter(|s| s.is_finished()) {
        let duration = session.duration_seconds().unwrap_or(0);

        stats.total_games = stats.total_games.saturating_add(1);
        if session.end_reason == EndReason::Completed {
            stats.games_won = stats.games_won.saturating_add(1);
        }

        stats.highest_score = stats.highest_score.max(session.score);
        stats.highest_level = stats.highest_level.max(session.final_level);
        stats.most_lines_cleared = stats.most_lines_cleared.max(session.lines_cleared);
        stats.longest_game_seconds = stats.longest_game_seconds.max(duration);

        stats.total_score = stats.total_score.saturating_add(session.score);
        stats.total_lines_cleared = stats
            .total_lines_cleared
            .saturating_add(session.lines_cleared as u64);
        stats.total_pieces_placed = stats
            .total_pieces_placed
            .saturating_add(session.pieces_placed as u64);
        stats.total_playtime_seconds = stats.total_playtime_seconds.saturating_add(duration);

        stats.first_game_at = Some(match stats.first_game_at {
            Some(first) => first.min(session.created_at),
            None => session.created_at,
        });
        stats.last_game_at = Some(match stats.last_game_at {
            Some(last) => last.max(session.created_at),
            None => session.created_at,
        });
    }

    if stats.total_games > 0 {
        let games = stats.total_games as f64;
        stats.average_score = round_to(stats.total_score as f64 / games, 2);
        stats.average_lines_per_game = round_to(stats.total_lines_cleared as f64 / games, 2);
    }

    stats
}
