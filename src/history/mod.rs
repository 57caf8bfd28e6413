// Public API - what other modules can use
pub use models::{GameRecord, GameStatus, NewGameRecord};
pub use repository::{
    GameHistoryRepository, InMemoryGameHistoryRepository, PostgresGameHistoryRepository,
};

// Internal modules
pub mod models;
pub mod repository;
