use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::command::CommandRouter;
use crate::history::repository::GameHistoryRepository;
use crate::player::repository::PlayerRepository;
use crate::roster::MemberDirectory;

/// Stable identity of a community member, as assigned by the chat platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PlayerId)
    }
}

/// Identity of a chat community; each guild owns at most one game session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub i64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub command_router: Arc<CommandRouter>,
    pub player_repository: Arc<dyn PlayerRepository + Send + Sync>,
    pub history_repository: Arc<dyn GameHistoryRepository + Send + Sync>,
    pub member_directory: Arc<dyn MemberDirectory + Send + Sync>,
}

impl AppState {
    pub fn new(
        command_router: Arc<CommandRouter>,
        player_repository: Arc<dyn PlayerRepository + Send + Sync>,
        history_repository: Arc<dyn GameHistoryRepository + Send + Sync>,
        member_directory: Arc<dyn MemberDirectory + Send + Sync>,
    ) -> Self {
        Self {
            command_router,
            player_repository,
            history_repository,
            member_directory,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
