// Library crate for the Elo matchmaking bot
// This file exposes the public API for integration tests

pub mod app;
pub mod command;
pub mod config;
pub mod history;
pub mod player;
pub mod rating;
pub mod roster;
pub mod session;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use app::{build_router, build_state};
pub use command::{CommandRouter, RouterConfig};
pub use config::AppConfig;
pub use history::{GameHistoryRepository, GameRecord, InMemoryGameHistoryRepository};
pub use player::{InMemoryPlayerRepository, Participant, PlayerModel, PlayerRepository};
pub use rating::{CommitMode, RatingEngine};
pub use roster::{InMemoryMemberDirectory, Member, MemberDirectory, RosterSync};
pub use session::{SessionError, SessionManager, SessionState};
pub use shared::{AppError, AppState, GuildId, PlayerId};
