use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::shared::{GuildId, PlayerId};

/// A community member as seen by the chat transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: PlayerId,
    pub display_name: String,
    #[serde(default)]
    pub is_bot: bool,
}

/// Source of the member lists used by roster sync
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Records or refreshes a member of the guild
    async fn record_member(&self, guild_id: GuildId, member: Member);

    async fn list_members(&self, guild_id: GuildId) -> Vec<Member>;

    /// All guilds the directory has seen members for
    async fn guilds(&self) -> Vec<GuildId>;
}

/// In-memory directory fed by the transport
#[derive(Debug, Default)]
pub struct InMemoryMemberDirectory {
    members: RwLock<HashMap<GuildId, HashMap<PlayerId, Member>>>,
}

impl InMemoryMemberDirectory {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl MemberDirectory for InMemoryMemberDirectory {
    async fn record_member(&self, guild_id: GuildId, member: Member) {
        let mut members = self.members.write().await;
        debug!(guild_id = %guild_id, member_id = %member.id, "Recording member");
        members.entry(guild_id).or_default().insert(member.id, member);
    }

    async fn list_members(&self, guild_id: GuildId) -> Vec<Member> {
        let members = self.members.read().await;
        let mut list: Vec<Member> = members
            .get(&guild_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by_key(|m| m.id);
        list
    }

    async fn guilds(&self) -> Vec<GuildId> {
        let members = self.members.read().await;
        let mut guilds: Vec<GuildId> = members.keys().copied().collect();
        guilds.sort();
        guilds
    }
}
