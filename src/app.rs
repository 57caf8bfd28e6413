use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::command::{get_games, get_ranking, post_command, post_members, CommandRouter, RouterConfig};
use crate::config::AppConfig;
use crate::history::GameHistoryRepository;
use crate::player::PlayerRepository;
use crate::rating::RatingEngine;
use crate::roster::{MemberDirectory, RosterSync};
use crate::session::SessionManager;
use crate::shared::AppState;

/// Wires the stores into a session manager and command router.
pub fn build_state(
    config: &AppConfig,
    players: Arc<dyn PlayerRepository + Send + Sync>,
    history: Arc<dyn GameHistoryRepository + Send + Sync>,
    directory: Arc<dyn MemberDirectory + Send + Sync>,
) -> AppState {
    let rating_engine = RatingEngine::new(Arc::clone(&players), config.commit_mode);
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&players),
        Arc::clone(&history),
        rating_engine,
    ));
    let roster = RosterSync::new(Arc::clone(&directory), Arc::clone(&players));
    let router = Arc::new(CommandRouter::new(
        sessions,
        Arc::clone(&players),
        roster,
        RouterConfig {
            prefix: config.command_prefix.clone(),
            admins: config.admin_ids.clone(),
        },
    ));

    AppState::new(router, players, history, directory)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ranking", get(get_ranking))
        .route("/guilds/:guild_id/commands", post(post_command))
        .route("/guilds/:guild_id/members", post(post_members))
        .route("/guilds/:guild_id/games", get(get_games))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let app = build_router(AppStateBuilder::new().build());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = build_router(AppStateBuilder::new().build());

        let response = app
            .oneshot(Request::builder().uri("/lobby").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
