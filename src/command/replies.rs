//! Human-readable reply texts sent back through the chat transport.

use strum::IntoEnumIterator;

use super::parser::CommandName;
use crate::player::PlayerModel;
use crate::rating::RatingChange;
use crate::session::{PendingResult, TeamLineup, ROSTER_SIZE};
use crate::shared::PlayerId;

pub fn joined(display_name: &str, player_count: usize) -> String {
    format!(
        "{} has joined the game! ({}/{})",
        display_name, player_count, ROSTER_SIZE
    )
}

pub fn teams_announced(team1: &TeamLineup, team2: &TeamLineup, prefix: &str) -> String {
    format!(
        "The teams are:\nTeam 1: {} - avg: {:.1}\nTeam 2: {} - avg: {:.1}\n\n\
         Please report the result using:\n {}result <team1-team2> for every map, e.g. 13-7 9-13",
        lineup_names(team1),
        team1.average_rating,
        lineup_names(team2),
        team2.average_rating,
        prefix
    )
}

fn lineup_names(lineup: &TeamLineup) -> String {
    lineup
        .players
        .iter()
        .map(|p| format!("**{}**", p.display_name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn result_reported(reporter: &str, pending: &PendingResult, prefix: &str) -> String {
    format!(
        "Result reported by {}: {}\n\n {}vote yes to confirm results.",
        reporter,
        pending.scores.join(" "),
        prefix
    )
}

pub fn voted(display_name: &str, ballot: impl std::fmt::Display) -> String {
    format!("{} voted {}.", display_name, ballot)
}

pub fn result_rejected() -> String {
    "The result has been rejected. Please report the correct result.".to_string()
}

pub fn result_accepted() -> String {
    "The result has been accepted.".to_string()
}

pub fn rating_change(change: &RatingChange) -> String {
    format!(
        "Updated Elo for {}: {} -> {} ({:+})",
        change.display_name, change.old_rating, change.new_rating, change.delta
    )
}

pub fn cancelled() -> String {
    "Game has been cancelled and has not been saved.".to_string()
}

pub fn ranking(players: &[PlayerModel]) -> String {
    if players.is_empty() {
        return "No Elo ratings available.".to_string();
    }

    let lines: String = players
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}: {}\n", i + 1, p.display_name, p.rating))
        .collect();
    format!("**Elo Rankings:**\n{}", lines)
}

pub fn rating_edited(player_id: PlayerId, rating: i32) -> String {
    format!("Elo for player {} has been updated to {}.", player_id, rating)
}

pub fn roster_synced(added: usize) -> String {
    format!("Roster synced: {} new players added.", added)
}

pub fn help(prefix: &str) -> String {
    let lines: Vec<String> = CommandName::iter()
        .map(|name| format!("- **{}{}** {}", prefix, name, name.usage()))
        .collect();
    format!("**Commands:**\n{}", lines.join("\n"))
}

pub fn generic_error(prefix: &str) -> String {
    format!(
        "An error occurred while processing the command.\n- **{p}join** to start playing\n- **{p}cancel** to reset current game",
        p = prefix
    )
}
