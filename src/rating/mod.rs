//! Elo rating computation and the per-side commit that writes it back.

pub use elo::{
    apply_delta, expected_score, rating_delta, result_fractions, BASE_RATING, K_FACTOR,
    RATING_FLOOR,
};
pub use engine::{CommitMode, RatingChange, RatingEngine};

mod elo;
mod engine;
