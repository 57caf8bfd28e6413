use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use elobot::{
    build_router, build_state, AppConfig, CommitMode, GameRecord, GuildId,
    InMemoryGameHistoryRepository, InMemoryMemberDirectory, InMemoryPlayerRepository, PlayerId,
    PlayerModel, SessionManager,
};

pub const GUILD: GuildId = GuildId(4242);
pub const ADMIN: PlayerId = PlayerId(9000);

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub sessions: Arc<SessionManager>,
    pub players: Arc<InMemoryPlayerRepository>,
    pub history: Arc<InMemoryGameHistoryRepository>,
    /// (id, display name) of everyone who will join
    pub roster: Vec<(PlayerId, String)>,
}

pub struct TestSetupBuilder {
    names: Vec<String>,
    seeded: Vec<PlayerModel>,
    commit_mode: CommitMode,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            names: vec!["alice", "bob", "charlie", "david"]
                .into_iter()
                .map(String::from)
                .collect(),
            seeded: Vec::new(),
            commit_mode: CommitMode::Sequential,
        }
    }

    pub fn with_rating(mut self, index: usize, rating: i32) -> Self {
        let id = PlayerId(index as i64 + 1);
        self.seeded
            .push(PlayerModel::new(id, self.names[index].clone()).with_rating(rating));
        self
    }

    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }

    pub fn build(self) -> TestSetup {
        let players = Arc::new(InMemoryPlayerRepository::with_players(self.seeded));
        let history = Arc::new(InMemoryGameHistoryRepository::new());
        let directory = Arc::new(InMemoryMemberDirectory::new());

        let config = AppConfig {
            database_url: None,
            bind_addr: "127.0.0.1:0".to_string(),
            admin_ids: HashSet::from([ADMIN]),
            command_prefix: "!".to_string(),
            commit_mode: self.commit_mode,
            cleanup: None,
        };
        let state = build_state(&config, players.clone(), history.clone(), directory);
        let sessions = Arc::clone(state.command_router.sessions());

        TestSetup {
            app: build_router(state),
            sessions,
            players,
            history,
            roster: self
                .names
                .into_iter()
                .enumerate()
                .map(|(i, name)| (PlayerId(i as i64 + 1), name))
                .collect(),
        }
    }
}

impl TestSetup {
    /// Posts a chat message and returns the bot's replies
    pub async fn send(&self, sender: PlayerId, name: &str, content: &str) -> Vec<String> {
        let body = serde_json::json!({
            "sender_id": sender,
            "sender_name": name,
            "content": content,
        });
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/guilds/{}/commands", GUILD))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = read_json(response).await;
        serde_json::from_value(body["replies"].clone()).unwrap()
    }

    pub async fn send_as(&self, index: usize, content: &str) -> Vec<String> {
        let (id, name) = &self.roster[index];
        self.send(*id, name, content).await
    }

    pub async fn admin(&self, content: &str) -> Vec<String> {
        self.send(ADMIN, "admin", content).await
    }

    /// Everyone on the roster joins, which forms the teams
    pub async fn fill_game(&self) -> Vec<String> {
        let mut last = Vec::new();
        for index in 0..self.roster.len() {
            last = self.send_as(index, "!join").await;
        }
        last
    }

    /// Ids of (team1, team2) in the current session
    pub async fn teams(&self) -> (Vec<PlayerId>, Vec<PlayerId>) {
        let session = self.sessions.snapshot(GUILD).await.unwrap();
        let teams = session.teams().unwrap();
        (
            teams.team1.iter().map(|p| p.id).collect(),
            teams.team2.iter().map(|p| p.id).collect(),
        )
    }

    pub async fn rating_of(&self, id: PlayerId) -> i32 {
        use elobot::PlayerRepository;
        self.players.get_player(id).await.unwrap().unwrap().rating
    }

    pub async fn games(&self) -> Vec<GameRecord> {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/guilds/{}/games", GUILD))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        read_json(response).await
    }

    pub fn index_of(&self, id: PlayerId) -> usize {
        self.roster.iter().position(|(pid, _)| *pid == id).unwrap()
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
