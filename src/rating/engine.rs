use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::{info, instrument};

use super::elo::{apply_delta, rating_delta, result_fractions, BASE_RATING};
use crate::player::{Participant, PlayerModel, PlayerRepository};
use crate::shared::{AppError, PlayerId};

/// How the two sides of a game are committed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CommitMode {
    /// Team 1 is written first; team 2's delta is then computed against
    /// team 1's already-updated ratings.
    #[default]
    Sequential,
    /// Both deltas come from the ratings as they were before the commit.
    Snapshot,
}

/// Rating movement of a single player caused by a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub display_name: String,
    pub old_rating: i32,
    pub new_rating: i32,
    pub delta: i32,
}

pub struct RatingEngine {
    players: Arc<dyn PlayerRepository + Send + Sync>,
    mode: CommitMode,
}

impl RatingEngine {
    pub fn new(players: Arc<dyn PlayerRepository + Send + Sync>, mode: CommitMode) -> Self {
        Self { players, mode }
    }

    /// Commits the outcome of a game for both teams.
    ///
    /// Returns the changes for team 1 followed by team 2.
    #[instrument(skip(self, team1, team2))]
    pub async fn commit_game(
        &self,
        team1: &[Participant],
        team2: &[Participant],
        team1_wins: u32,
        team2_wins: u32,
    ) -> Result<Vec<RatingChange>, AppError> {
        let (result1, result2) = result_fractions(team1_wins, team2_wins);

        let changes = match self.mode {
            CommitMode::Sequential => {
                let mut changes = self.commit_side(team1, team2, result1).await?;
                changes.extend(self.commit_side(team2, team1, result2).await?);
                changes
            }
            CommitMode::Snapshot => {
                let side1 = self.load_side(team1).await?;
                let side2 = self.load_side(team2).await?;
                let delta1 = rating_delta(average(&side1), average(&side2), result1);
                let delta2 = rating_delta(average(&side2), average(&side1), result2);

                let mut changes = self.apply(side1, delta1).await?;
                changes.extend(self.apply(side2, delta2).await?);
                changes
            }
        };

        info!(
            mode = %self.mode,
            team1_wins,
            team2_wins,
            updated = changes.len(),
            "Ratings committed"
        );
        Ok(changes)
    }

    /// Computes one side's delta from the current store contents and writes it back
    async fn commit_side(
        &self,
        side: &[Participant],
        opponents: &[Participant],
        result: f64,
    ) -> Result<Vec<RatingChange>, AppError> {
        let side_players = self.load_side(side).await?;
        let opponent_players = self.load_side(opponents).await?;

        let delta = rating_delta(average(&side_players), average(&opponent_players), result);
        self.apply(side_players, delta).await
    }

    async fn load_side(&self, side: &[Participant]) -> Result<Vec<PlayerModel>, AppError> {
        let mut players = Vec::with_capacity(side.len());
        for participant in side {
            players.push(
                self.players
                    .ensure_player(participant.id, &participant.display_name)
                    .await?,
            );
        }
        Ok(players)
    }

    async fn apply(
        &self,
        players: Vec<PlayerModel>,
        delta: i32,
    ) -> Result<Vec<RatingChange>, AppError> {
        let mut changes = Vec::with_capacity(players.len());
        for player in players {
            let old_rating = player.rating;
            let updated = PlayerModel {
                rating: apply_delta(old_rating, delta),
                ..player
            };
            self.players.upsert_player(&updated).await?;

            info!(
                player_id = %updated.id,
                old_rating,
                new_rating = updated.rating,
                delta,
                "Rating updated"
            );

            changes.push(RatingChange {
                player_id: updated.id,
                display_name: updated.display_name,
                old_rating,
                new_rating: updated.rating,
                delta,
            });
        }
        Ok(changes)
    }
}

fn average(players: &[PlayerModel]) -> f64 {
    if players.is_empty() {
        return BASE_RATING as f64;
    }
    players.iter().map(|p| p.rating as f64).sum::<f64>() / players.len() as f64
}
