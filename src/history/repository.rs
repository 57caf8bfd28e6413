use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::models::{GameRecord, GameStatus, NewGameRecord};
use crate::shared::{AppError, GuildId, PlayerId};

/// Append-only log of committed games
#[async_trait]
pub trait GameHistoryRepository {
    /// Appends a committed game and returns it with its assigned id
    async fn append_game(&self, record: NewGameRecord) -> Result<GameRecord, AppError>;
    async fn list_games(&self, guild_id: GuildId) -> Result<Vec<GameRecord>, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryGameHistoryRepository {
    games: RwLock<Vec<GameRecord>>,
}

impl InMemoryGameHistoryRepository {
    pub fn new() -> Self {
        Self {
            games: RwLock::new(Vec::new()),
        }
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }
}

#[async_trait]
impl GameHistoryRepository for InMemoryGameHistoryRepository {
    #[instrument(skip(self, record), fields(guild_id = %record.guild_id))]
    async fn append_game(&self, record: NewGameRecord) -> Result<GameRecord, AppError> {
        let mut games = self.games.write().await;
        let id = games.len() as i64 + 1;
        let game = GameRecord::from_new(id, record, Utc::now());
        games.push(game.clone());

        debug!(game_id = id, "Game appended to in-memory history");
        Ok(game)
    }

    #[instrument(skip(self))]
    async fn list_games(&self, guild_id: GuildId) -> Result<Vec<GameRecord>, AppError> {
        let games = self.games.read().await;
        Ok(games
            .iter()
            .filter(|g| g.guild_id == guild_id)
            .cloned()
            .collect())
    }
}

/// PostgreSQL implementation of the game history log
pub struct PostgresGameHistoryRepository {
    pool: PgPool,
}

impl PostgresGameHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the games table when it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS games (
                game_id BIGSERIAL PRIMARY KEY,
                guild_id BIGINT NOT NULL,
                state TEXT NOT NULL,
                team1_score INTEGER NOT NULL,
                team2_score INTEGER NOT NULL,
                team1 BIGINT[] NOT NULL,
                team2 BIGINT[] NOT NULL,
                completed_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn ids(ids: &[PlayerId]) -> Vec<i64> {
        ids.iter().map(|id| id.0).collect()
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<GameRecord, AppError> {
        let status: String = row.get("state");
        let status = status
            .parse::<GameStatus>()
            .map_err(|_| AppError::DatabaseError(format!("Unknown game state: {}", status)))?;
        let team1: Vec<i64> = row.get("team1");
        let team2: Vec<i64> = row.get("team2");
        let team1_score: i32 = row.get("team1_score");
        let team2_score: i32 = row.get("team2_score");
        let completed_at: DateTime<Utc> = row.get("completed_at");

        Ok(GameRecord {
            id: row.get("game_id"),
            guild_id: GuildId(row.get("guild_id")),
            status,
            team1: team1.into_iter().map(PlayerId).collect(),
            team2: team2.into_iter().map(PlayerId).collect(),
            team1_score: team1_score.max(0) as u32,
            team2_score: team2_score.max(0) as u32,
            completed_at,
        })
    }
}

#[async_trait]
impl GameHistoryRepository for PostgresGameHistoryRepository {
    #[instrument(skip(self, record), fields(guild_id = %record.guild_id))]
    async fn append_game(&self, record: NewGameRecord) -> Result<GameRecord, AppError> {
        let completed_at = Utc::now();

        let row = sqlx::query(
            "INSERT INTO games (guild_id, state, team1_score, team2_score, team1, team2, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING game_id",
        )
        .bind(record.guild_id.0)
        .bind(GameStatus::Completed.to_string())
        .bind(record.team1_score as i32)
        .bind(record.team2_score as i32)
        .bind(Self::ids(&record.team1))
        .bind(Self::ids(&record.team2))
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to append game to database");
            AppError::DatabaseError(e.to_string())
        })?;

        let id: i64 = row.get("game_id");
        info!(game_id = id, "Game appended to history");
        Ok(GameRecord::from_new(id, record, completed_at))
    }

    #[instrument(skip(self))]
    async fn list_games(&self, guild_id: GuildId) -> Result<Vec<GameRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT game_id, guild_id, state, team1_score, team2_score, team1, team2, completed_at
             FROM games WHERE guild_id = $1 ORDER BY game_id ASC",
        )
        .bind(guild_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, guild_id = %guild_id, "Failed to list games from database");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
