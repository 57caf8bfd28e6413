// Public API - what other modules can use
pub use cleanup_task::{start_cleanup_task, CleanupConfig};
pub use errors::SessionError;
pub use models::{
    Ballot, GameSession, MapScore, PendingResult, SessionState, Teams, Vote, ROSTER_SIZE,
};
pub use service::{JoinReport, SessionManager, TeamLineup, VoteReport};

// Internal modules
mod cleanup_task;
mod errors;
pub mod models;
pub mod service;
