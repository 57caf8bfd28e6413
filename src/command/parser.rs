use strum_macros::{Display, EnumIter, EnumString};

use crate::session::SessionError;
use crate::shared::PlayerId;

/// Command names understood by the router, with their accepted aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum CommandName {
    #[strum(to_string = "join-game", serialize = "join", serialize = "play")]
    JoinGame,
    #[strum(to_string = "report-result", serialize = "result")]
    ReportResult,
    #[strum(to_string = "vote")]
    Vote,
    #[strum(to_string = "cancel")]
    Cancel,
    #[strum(to_string = "ranking", serialize = "rankings")]
    Ranking,
    #[strum(to_string = "edit-rating", serialize = "editelo")]
    EditRating,
    #[strum(to_string = "sync-roster", serialize = "getplayers")]
    SyncRoster,
    #[strum(to_string = "help")]
    Help,
}

impl CommandName {
    pub fn usage(&self) -> &'static str {
        match self {
            CommandName::JoinGame => "join the next game",
            CommandName::ReportResult => "<a-b> [a-b ...] report map scores, team 1 first",
            CommandName::Vote => "<yes|no> confirm or reject the reported result",
            CommandName::Cancel => "reset the current game without saving",
            CommandName::Ranking => "show everyone's rating",
            CommandName::EditRating => "<player id> <rating> override a rating (admins only)",
            CommandName::SyncRoster => "add every known member to the ratings",
            CommandName::Help => "show this message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    JoinGame,
    ReportResult { scores: Vec<String> },
    Vote { ballot: String },
    Cancel,
    Ranking,
    EditRating { player_id: PlayerId, rating: i32 },
    SyncRoster,
    Help,
}

/// Parses a chat message into a command.
///
/// Returns `None` for messages that do not start with `prefix`; those are
/// ordinary chat and get no reply.
pub fn parse_command(prefix: &str, content: &str) -> Option<Result<Command, SessionError>> {
    let body = content.trim().strip_prefix(prefix)?;
    let mut tokens = body.split_whitespace();
    let name = tokens.next()?;
    let args: Vec<String> = tokens.map(str::to_string).collect();

    let Ok(name) = name.parse::<CommandName>() else {
        return Some(Err(SessionError::MalformedInput(format!(
            "Unknown command `{}`. Use {}help to list commands.",
            name, prefix
        ))));
    };

    Some(build(name, args))
}

fn build(name: CommandName, mut args: Vec<String>) -> Result<Command, SessionError> {
    let command = match name {
        CommandName::JoinGame => Command::JoinGame,
        CommandName::ReportResult => Command::ReportResult { scores: args },
        CommandName::Vote => {
            if args.is_empty() {
                return Err(missing_argument("vote"));
            }
            Command::Vote {
                ballot: args.swap_remove(0),
            }
        }
        CommandName::Cancel => Command::Cancel,
        CommandName::Ranking => Command::Ranking,
        CommandName::EditRating => {
            let [player_id, rating] = match <[String; 2]>::try_from(args) {
                Ok(pair) => pair,
                Err(args) if args.is_empty() => return Err(missing_argument("player_id")),
                Err(args) if args.len() == 1 => return Err(missing_argument("new_elo")),
                Err(_) => return Err(invalid_argument()),
            };
            Command::EditRating {
                player_id: player_id.parse().map_err(|_| invalid_argument())?,
                rating: rating.trim().parse().map_err(|_| invalid_argument())?,
            }
        }
        CommandName::SyncRoster => Command::SyncRoster,
        CommandName::Help => Command::Help,
    };
    Ok(command)
}

fn missing_argument(name: &str) -> SessionError {
    SessionError::MalformedInput(format!(
        "Error: Missing required argument `{}`. Please provide all required arguments.",
        name
    ))
}

fn invalid_argument() -> SessionError {
    SessionError::MalformedInput("Error: Invalid argument type.".to_string())
}
