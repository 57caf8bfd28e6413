use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::types::{CommandRequest, CommandResponse, MembersRecordedResponse};
use crate::history::{GameHistoryRepository, GameRecord};
use crate::player::{Participant, PlayerModel, PlayerRepository};
use crate::roster::{Member, MemberDirectory};
use crate::shared::{AppError, AppState, GuildId};

/// HTTP handler for a chat message forwarded by the transport
///
/// POST /guilds/:guild_id/commands
/// Returns the replies to post back to the channel
#[instrument(name = "post_command", skip(state, request), fields(sender_id = %request.sender_id))]
pub async fn post_command(
    State(state): State<AppState>,
    Path(guild_id): Path<GuildId>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let sender_name = request.sender_name.trim();
    if sender_name.is_empty() {
        return Err(AppError::BadRequest(
            "sender_name cannot be empty".to_string(),
        ));
    }

    state
        .member_directory
        .record_member(
            guild_id,
            Member {
                id: request.sender_id,
                display_name: sender_name.to_string(),
                is_bot: false,
            },
        )
        .await;

    let sender = Participant::new(request.sender_id, sender_name);
    let replies = state
        .command_router
        .handle(guild_id, sender, &request.content)
        .await;

    Ok(Json(CommandResponse { replies }))
}

/// HTTP handler for registering a guild's member list
///
/// POST /guilds/:guild_id/members
#[instrument(name = "post_members", skip(state, members))]
pub async fn post_members(
    State(state): State<AppState>,
    Path(guild_id): Path<GuildId>,
    Json(members): Json<Vec<Member>>,
) -> Result<Json<MembersRecordedResponse>, AppError> {
    let recorded = members.len();
    for member in members {
        state.member_directory.record_member(guild_id, member).await;
    }

    info!(guild_id = %guild_id, recorded, "Members recorded");
    Ok(Json(MembersRecordedResponse { recorded }))
}

/// HTTP handler for the global ranking
///
/// GET /ranking
#[instrument(name = "get_ranking", skip(state))]
pub async fn get_ranking(State(state): State<AppState>) -> Result<Json<Vec<PlayerModel>>, AppError> {
    let players = state.player_repository.list_by_rating_desc().await?;
    Ok(Json(players))
}

/// HTTP handler for a guild's committed games
///
/// GET /guilds/:guild_id/games
#[instrument(name = "get_games", skip(state))]
pub async fn get_games(
    State(state): State<AppState>,
    Path(guild_id): Path<GuildId>,
) -> Result<Json<Vec<GameRecord>>, AppError> {
    let games = state.history_repository.list_games(guild_id).await?;
    Ok(Json(games))
}
