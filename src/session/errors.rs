use thiserror::Error;

use crate::shared::AppError;

/// Why a session command was rejected.
///
/// Every variant except `Storage` is recovered locally: the session is left
/// unchanged and the message is shown to the sender.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidState(String),

    #[error("You are not part of the current game.")]
    NotAParticipant,

    #[error("{0}")]
    DuplicateAction(String),

    #[error("{0}")]
    MalformedInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] AppError),
}

impl SessionError {
    /// Whether the failure should reach the operator rather than just the sender
    pub fn is_unclassified(&self) -> bool {
        matches!(self, SessionError::Storage(_))
    }
}
