use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::parser::{parse_command, Command};
use super::replies;
use crate::player::{Participant, PlayerModel, PlayerRepository};
use crate::rating::RATING_FLOOR;
use crate::roster::RosterSync;
use crate::session::{JoinReport, SessionError, SessionManager, VoteReport};
use crate::shared::{GuildId, PlayerId};

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub prefix: String,
    /// Identities allowed to run admin commands
    pub admins: HashSet<PlayerId>,
}

/// Turns chat messages into session operations and reply texts
pub struct CommandRouter {
    sessions: Arc<SessionManager>,
    players: Arc<dyn PlayerRepository + Send + Sync>,
    roster: RosterSync,
    config: RouterConfig,
}

impl CommandRouter {
    pub fn new(
        sessions: Arc<SessionManager>,
        players: Arc<dyn PlayerRepository + Send + Sync>,
        roster: RosterSync,
        config: RouterConfig,
    ) -> Self {
        Self {
            sessions,
            players,
            roster,
            config,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn roster(&self) -> &RosterSync {
        &self.roster
    }

    /// Handles one chat message and returns the replies to deliver, in order.
    ///
    /// Non-command messages produce no replies. Failures never escape: the
    /// sender gets a message and unclassified failures are logged at error level.
    #[instrument(skip(self, sender, content), fields(sender_id = %sender.id))]
    pub async fn handle(&self, guild_id: GuildId, sender: Participant, content: &str) -> Vec<String> {
        let command = match parse_command(&self.config.prefix, content) {
            None => return Vec::new(),
            Some(Ok(command)) => command,
            Some(Err(e)) => return self.reject(guild_id, &sender, e),
        };

        debug!(guild_id = %guild_id, command = ?command, "Dispatching command");

        match self.dispatch(guild_id, &sender, command).await {
            Ok(replies) => replies,
            Err(e) => self.reject(guild_id, &sender, e),
        }
    }

    async fn dispatch(
        &self,
        guild_id: GuildId,
        sender: &Participant,
        command: Command,
    ) -> Result<Vec<String>, SessionError> {
        let prefix = self.config.prefix.as_str();

        match command {
            Command::JoinGame => match self.sessions.join(guild_id, sender.clone()).await? {
                JoinReport::Joined {
                    player,
                    player_count,
                } => Ok(vec![replies::joined(&player.display_name, player_count)]),
                JoinReport::GameStarted {
                    player,
                    team1,
                    team2,
                } => Ok(vec![
                    replies::joined(&player.display_name, crate::session::ROSTER_SIZE),
                    replies::teams_announced(&team1, &team2, prefix),
                ]),
            },
            Command::ReportResult { scores } => {
                let (reporter, pending) = self
                    .sessions
                    .report_result(guild_id, sender.id, &scores)
                    .await?;
                Ok(vec![replies::result_reported(
                    &reporter.display_name,
                    &pending,
                    prefix,
                )])
            }
            Command::Vote { ballot } => {
                match self.sessions.vote(guild_id, sender.id, &ballot).await? {
                    VoteReport::Recorded { voter, ballot, .. } => {
                        Ok(vec![replies::voted(&voter.display_name, ballot)])
                    }
                    VoteReport::Rejected { voter, ballot } => Ok(vec![
                        replies::voted(&voter.display_name, ballot),
                        replies::result_rejected(),
                    ]),
                    VoteReport::Accepted {
                        voter,
                        ballot,
                        changes,
                        ..
                    } => {
                        let mut out = vec![
                            replies::voted(&voter.display_name, ballot),
                            replies::result_accepted(),
                        ];
                        out.extend(changes.iter().map(replies::rating_change));
                        Ok(out)
                    }
                }
            }
            Command::Cancel => {
                self.sessions.cancel(guild_id).await;
                Ok(vec![replies::cancelled()])
            }
            Command::Ranking => {
                let players = self.players.list_by_rating_desc().await?;
                Ok(vec![replies::ranking(&players)])
            }
            Command::EditRating { player_id, rating } => {
                self.edit_rating(sender, player_id, rating).await
            }
            Command::SyncRoster => {
                let added = self.roster.sync_guild(guild_id).await?;
                Ok(vec![replies::roster_synced(added)])
            }
            Command::Help => Ok(vec![replies::help(prefix)]),
        }
    }

    async fn edit_rating(
        &self,
        sender: &Participant,
        player_id: PlayerId,
        rating: i32,
    ) -> Result<Vec<String>, SessionError> {
        if !self.config.admins.contains(&sender.id) {
            return Err(SessionError::Unauthorized(
                "You do not have permission to edit Elo ratings.".to_string(),
            ));
        }
        if rating < RATING_FLOOR {
            return Err(SessionError::MalformedInput(format!(
                "Rating must be at least {}.",
                RATING_FLOOR
            )));
        }

        let player = self
            .players
            .get_player(player_id)
            .await?
            .ok_or_else(|| SessionError::MalformedInput(format!("Unknown player {}.", player_id)))?;

        let old_rating = player.rating;
        self.players
            .upsert_player(&PlayerModel { rating, ..player })
            .await?;

        info!(
            admin_id = %sender.id,
            player_id = %player_id,
            old_rating,
            new_rating = rating,
            "Rating overridden by admin"
        );
        Ok(vec![replies::rating_edited(player_id, rating)])
    }

    fn reject(&self, guild_id: GuildId, sender: &Participant, e: SessionError) -> Vec<String> {
        if e.is_unclassified() {
            error!(
                guild_id = %guild_id,
                sender_id = %sender.id,
                error = %e,
                "Command failed"
            );
            return vec![replies::generic_error(&self.config.prefix)];
        }

        debug!(guild_id = %guild_id, sender_id = %sender.id, reason = %e, "Command rejected");
        vec![e.to_string()]
    }
}
