// Public API - what other modules can use
pub use handlers::{get_games, get_ranking, post_command, post_members};
pub use parser::{parse_command, Command, CommandName};
pub use router::{CommandRouter, RouterConfig};

// Internal modules
mod handlers;
mod parser;
pub mod replies;
mod router;
pub mod types;
