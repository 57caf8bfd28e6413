use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::PlayerModel;
use crate::shared::{AppError, PlayerId};

/// Trait for player rating storage
#[async_trait]
pub trait PlayerRepository {
    async fn get_player(&self, player_id: PlayerId) -> Result<Option<PlayerModel>, AppError>;

    /// Inserts the player or overwrites display name and rating of an existing record
    async fn upsert_player(&self, player: &PlayerModel) -> Result<(), AppError>;

    /// Returns the stored player, creating it at the base rating when absent.
    /// An existing record is returned untouched.
    async fn ensure_player(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<PlayerModel, AppError>;

    async fn list_by_rating_desc(&self) -> Result<Vec<PlayerModel>, AppError>;
}

/// In-memory implementation of PlayerRepository for development and testing
///
/// Ratings are lost when the process restarts.
#[derive(Debug, Default)]
pub struct InMemoryPlayerRepository {
    players: RwLock<HashMap<PlayerId, PlayerModel>>,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated players
    pub fn with_players(players: Vec<PlayerModel>) -> Self {
        let players = players.into_iter().map(|p| (p.id, p)).collect();
        Self {
            players: RwLock::new(players),
        }
    }

    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    #[instrument(skip(self))]
    async fn get_player(&self, player_id: PlayerId) -> Result<Option<PlayerModel>, AppError> {
        let players = self.players.read().await;
        Ok(players.get(&player_id).cloned())
    }

    #[instrument(skip(self, player), fields(player_id = %player.id))]
    async fn upsert_player(&self, player: &PlayerModel) -> Result<(), AppError> {
        debug!(rating = player.rating, "Upserting player in memory");
        let mut players = self.players.write().await;
        players.insert(player.id, player.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ensure_player(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<PlayerModel, AppError> {
        let mut players = self.players.write().await;
        let player = players.entry(player_id).or_insert_with(|| {
            debug!(player_id = %player_id, "Creating player at base rating");
            PlayerModel::new(player_id, display_name)
        });
        Ok(player.clone())
    }

    #[instrument(skip(self))]
    async fn list_by_rating_desc(&self) -> Result<Vec<PlayerModel>, AppError> {
        let players = self.players.read().await;
        let mut ranking: Vec<PlayerModel> = players.values().cloned().collect();
        ranking.sort_by(|a, b| b.rating.cmp(&a.rating).then(a.id.cmp(&b.id)));
        Ok(ranking)
    }
}

/// PostgreSQL implementation of the player store
pub struct PostgresPlayerRepository {
    pool: PgPool,
}

impl PostgresPlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the players table when it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS players (
                player_id BIGINT PRIMARY KEY,
                display_name TEXT NOT NULL,
                elo INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_player(row: &sqlx::postgres::PgRow) -> PlayerModel {
        PlayerModel {
            id: PlayerId(row.get("player_id")),
            display_name: row.get("display_name"),
            rating: row.get("elo"),
        }
    }
}

#[async_trait]
impl PlayerRepository for PostgresPlayerRepository {
    #[instrument(skip(self))]
    async fn get_player(&self, player_id: PlayerId) -> Result<Option<PlayerModel>, AppError> {
        let row = sqlx::query("SELECT player_id, display_name, elo FROM players WHERE player_id = $1")
            .bind(player_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, player_id = %player_id, "Failed to fetch player from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.as_ref().map(Self::row_to_player))
    }

    #[instrument(skip(self, player), fields(player_id = %player.id))]
    async fn upsert_player(&self, player: &PlayerModel) -> Result<(), AppError> {
        debug!(rating = player.rating, "Upserting player in database");

        sqlx::query(
            "INSERT INTO players (player_id, display_name, elo) VALUES ($1, $2, $3)
             ON CONFLICT (player_id) DO UPDATE SET display_name = EXCLUDED.display_name, elo = EXCLUDED.elo",
        )
        .bind(player.id.0)
        .bind(&player.display_name)
        .bind(player.rating)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to upsert player in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn ensure_player(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> Result<PlayerModel, AppError> {
        let fresh = PlayerModel::new(player_id, display_name);

        sqlx::query(
            "INSERT INTO players (player_id, display_name, elo) VALUES ($1, $2, $3)
             ON CONFLICT (player_id) DO NOTHING",
        )
        .bind(fresh.id.0)
        .bind(&fresh.display_name)
        .bind(fresh.rating)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = %player_id, "Failed to ensure player in database");
            AppError::DatabaseError(e.to_string())
        })?;

        self.get_player(player_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {} vanished after insert", player_id)))
    }

    #[instrument(skip(self))]
    async fn list_by_rating_desc(&self) -> Result<Vec<PlayerModel>, AppError> {
        let rows = sqlx::query(
            "SELECT player_id, display_name, elo FROM players ORDER BY elo DESC, player_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list players from database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(Self::row_to_player).collect())
    }
}
