// Public API - what other modules can use
pub use directory::{InMemoryMemberDirectory, Member, MemberDirectory};
pub use sync::RosterSync;

// Internal modules
mod directory;
mod sync;
