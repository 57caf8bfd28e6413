use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::directory::MemberDirectory;
use crate::player::PlayerRepository;
use crate::shared::{AppError, GuildId};

/// Makes sure every known community member has a rating record
pub struct RosterSync {
    directory: Arc<dyn MemberDirectory + Send + Sync>,
    players: Arc<dyn PlayerRepository + Send + Sync>,
}

impl RosterSync {
    pub fn new(
        directory: Arc<dyn MemberDirectory + Send + Sync>,
        players: Arc<dyn PlayerRepository + Send + Sync>,
    ) -> Self {
        Self { directory, players }
    }

    /// Creates missing records for the guild's members. Bots are skipped and
    /// existing ratings are never touched. Returns how many records were added.
    #[instrument(skip(self))]
    pub async fn sync_guild(&self, guild_id: GuildId) -> Result<usize, AppError> {
        let mut added = 0;
        for member in self.directory.list_members(guild_id).await {
            if member.is_bot {
                continue;
            }
            if self.players.get_player(member.id).await?.is_some() {
                continue;
            }
            self.players
                .ensure_player(member.id, &member.display_name)
                .await?;
            debug!(member_id = %member.id, display_name = %member.display_name, "Added member to ratings");
            added += 1;
        }

        info!(guild_id = %guild_id, added, "Roster sync finished");
        Ok(added)
    }

    /// Syncs every guild the directory knows about
    pub async fn sync_all(&self) -> Result<usize, AppError> {
        let mut added = 0;
        for guild_id in self.directory.guilds().await {
            added += self.sync_guild(guild_id).await?;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{InMemoryPlayerRepository, PlayerModel};
    use crate::roster::{InMemoryMemberDirectory, Member};
    use crate::shared::PlayerId;

    fn member(id: i64, is_bot: bool) -> Member {
        Member {
            id: PlayerId(id),
            display_name: format!("member-{}", id),
            is_bot,
        }
    }

    #[tokio::test]
    async fn test_sync_adds_missing_humans_only() {
        let directory = Arc::new(InMemoryMemberDirectory::new());
        let players = Arc::new(InMemoryPlayerRepository::with_players(vec![
            PlayerModel::new(PlayerId(1), "member-1").with_rating(1400),
        ]));
        directory.record_member(GuildId(1), member(1, false)).await;
        directory.record_member(GuildId(1), member(2, false)).await;
        directory.record_member(GuildId(1), member(3, true)).await;
        let sync = RosterSync::new(directory, players.clone());

        let added = sync.sync_guild(GuildId(1)).await.unwrap();

        assert_eq!(added, 1);
        assert_eq!(players.player_count().await, 2);
        let existing = players.get_player(PlayerId(1)).await.unwrap().unwrap();
        assert_eq!(existing.rating, 1400);
        let fresh = players.get_player(PlayerId(2)).await.unwrap().unwrap();
        assert_eq!(fresh.rating, 1000);
    }

    #[tokio::test]
    async fn test_sync_all_covers_every_guild() {
        let directory = Arc::new(InMemoryMemberDirectory::new());
        let players = Arc::new(InMemoryPlayerRepository::new());
        directory.record_member(GuildId(1), member(1, false)).await;
        directory.record_member(GuildId(2), member(2, false)).await;
        let sync = RosterSync::new(directory, players.clone());

        assert_eq!(sync.sync_all().await.unwrap(), 2);
        assert_eq!(sync.sync_all().await.unwrap(), 0);
    }
}
