use serde::{Deserialize, Serialize};

use crate::rating::BASE_RATING;
use crate::shared::PlayerId;

/// Stored rating record for a community member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerModel {
    pub id: PlayerId,
    pub display_name: String,
    pub rating: i32,
}

impl PlayerModel {
    /// Creates a player at the base rating
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            rating: BASE_RATING,
        }
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = rating;
        self
    }
}

/// A player taking part in a session, as resolved by the chat transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: PlayerId,
    pub display_name: String,
}

impl Participant {
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}
