use serde::{Deserialize, Serialize};

use crate::shared::PlayerId;

/// A chat message forwarded by the transport
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandRequest {
    pub sender_id: PlayerId,
    pub sender_name: String,
    pub content: String,
}

/// Replies to deliver back to the channel, in order
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub replies: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembersRecordedResponse {
    pub recorded: usize,
}
