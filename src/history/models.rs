use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::shared::{GuildId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    Completed,
}

/// A committed game as it is handed to the history log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameRecord {
    pub guild_id: GuildId,
    pub team1: Vec<PlayerId>,
    pub team2: Vec<PlayerId>,
    pub team1_score: u32,
    pub team2_score: u32,
}

/// Immutable entry of the game history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: i64,
    pub guild_id: GuildId,
    pub status: GameStatus,
    pub team1: Vec<PlayerId>,
    pub team2: Vec<PlayerId>,
    pub team1_score: u32,
    pub team2_score: u32,
    pub completed_at: DateTime<Utc>,
}

impl GameRecord {
    pub fn from_new(id: i64, record: NewGameRecord, completed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            guild_id: record.guild_id,
            status: GameStatus::Completed,
            team1: record.team1,
            team2: record.team2,
            team1_score: record.team1_score,
            team2_score: record.team2_score,
            completed_at,
        }
    }
}
