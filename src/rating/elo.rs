/// Rating assigned to a player on first contact
pub const BASE_RATING: i32 = 1000;

/// Ratings never drop below this value
pub const RATING_FLOOR: i32 = 100;

/// Magnitude of the rating change per game
pub const K_FACTOR: f64 = 128.0;

/// Predicted score of side A against side B, in [0, 1]
pub fn expected_score(avg_a: f64, avg_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((avg_b - avg_a) / 400.0))
}

/// Rating change for every player on side A given A's actual result fraction
pub fn rating_delta(avg_a: f64, avg_b: f64, result: f64) -> i32 {
    (K_FACTOR * (result - expected_score(avg_a, avg_b))).round() as i32
}

/// Applies a delta and clamps to the rating floor
pub fn apply_delta(rating: i32, delta: i32) -> i32 {
    rating.saturating_add(delta).max(RATING_FLOOR)
}

/// Result fractions of (team1, team2) from map wins.
/// A game with no scored maps counts as a draw.
pub fn result_fractions(team1_wins: u32, team2_wins: u32) -> (f64, f64) {
    let total = team1_wins + team2_wins;
    if total == 0 {
        return (0.5, 0.5);
    }
    let total = total as f64;
    (team1_wins as f64 / total, team2_wins as f64 / total)
}
