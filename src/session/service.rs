use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use super::errors::SessionError;
use super::models::{
    Ballot, GameSession, JoinOutcome, PendingResult, SessionState, Teams, VoteOutcome,
};
use crate::history::{GameHistoryRepository, GameRecord, NewGameRecord};
use crate::player::{Participant, PlayerRepository};
use crate::rating::{RatingChange, RatingEngine};
use crate::shared::{GuildId, PlayerId};

/// A team as announced when the game starts
#[derive(Debug, Clone, PartialEq)]
pub struct TeamLineup {
    pub players: Vec<Participant>,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinReport {
    Joined {
        player: Participant,
        player_count: usize,
    },
    GameStarted {
        player: Participant,
        team1: TeamLineup,
        team2: TeamLineup,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoteReport {
    Recorded {
        voter: Participant,
        ballot: Ballot,
        pending: usize,
    },
    Rejected {
        voter: Participant,
        ballot: Ballot,
    },
    Accepted {
        voter: Participant,
        ballot: Ballot,
        record: GameRecord,
        changes: Vec<RatingChange>,
    },
}

type SessionSlot = Arc<AsyncMutex<GameSession>>;

/// Owns every guild's game session.
///
/// Each guild has its own slot; a command holds the slot's lock from the
/// state check through all store I/O, so commands for one guild never
/// interleave while other guilds proceed independently.
pub struct SessionManager {
    sessions: RwLock<HashMap<GuildId, SessionSlot>>,
    players: Arc<dyn PlayerRepository + Send + Sync>,
    history: Arc<dyn GameHistoryRepository + Send + Sync>,
    rating_engine: RatingEngine,
}

impl SessionManager {
    pub fn new(
        players: Arc<dyn PlayerRepository + Send + Sync>,
        history: Arc<dyn GameHistoryRepository + Send + Sync>,
        rating_engine: RatingEngine,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            players,
            history,
            rating_engine,
        }
    }

    #[instrument(skip(self, player), fields(player_id = %player.id))]
    pub async fn join(
        &self,
        guild_id: GuildId,
        player: Participant,
    ) -> Result<JoinReport, SessionError> {
        let slot = self.slot(guild_id).await;
        let mut session = slot.lock().await;

        // Applied to a copy so a failed store call leaves the roster as it was
        let mut next = session.clone();
        let outcome = {
            let mut rng = rand::rng();
            next.join(player.clone(), &mut rng)?
        };

        self.players
            .ensure_player(player.id, &player.display_name)
            .await?;

        let report = match outcome {
            JoinOutcome::Joined { player_count } => {
                info!(guild_id = %guild_id, player_count, "Player joined session");
                JoinReport::Joined {
                    player,
                    player_count,
                }
            }
            JoinOutcome::TeamsFormed(teams) => {
                let Teams { team1, team2 } = teams;
                let team1 = self.lineup(team1).await?;
                let team2 = self.lineup(team2).await?;
                info!(
                    guild_id = %guild_id,
                    team1_avg = team1.average_rating,
                    team2_avg = team2.average_rating,
                    "Session full, teams formed"
                );
                JoinReport::GameStarted {
                    player,
                    team1,
                    team2,
                }
            }
        };

        *session = next;
        Ok(report)
    }

    #[instrument(skip(self, scores))]
    pub async fn report_result(
        &self,
        guild_id: GuildId,
        reporter: PlayerId,
        scores: &[String],
    ) -> Result<(Participant, PendingResult), SessionError> {
        let slot = self.slot(guild_id).await;
        let mut session = slot.lock().await;

        let pending = session.report_result(reporter, scores)?.clone();
        let reporter = session
            .participant(reporter)
            .cloned()
            .ok_or(SessionError::NotAParticipant)?;

        info!(
            guild_id = %guild_id,
            team1_wins = pending.team1_wins,
            team2_wins = pending.team2_wins,
            "Result reported, vote opened"
        );
        Ok((reporter, pending))
    }

    #[instrument(skip(self))]
    pub async fn vote(
        &self,
        guild_id: GuildId,
        voter: PlayerId,
        raw: &str,
    ) -> Result<VoteReport, SessionError> {
        let slot = self.slot(guild_id).await;
        let mut session = slot.lock().await;

        let outcome = session.vote(voter, raw)?;
        let voter = session
            .participant(voter)
            .cloned()
            .ok_or(SessionError::NotAParticipant)?;

        match outcome {
            VoteOutcome::Recorded { ballot, pending } => {
                debug!(guild_id = %guild_id, pending, "Vote recorded");
                Ok(VoteReport::Recorded {
                    voter,
                    ballot,
                    pending,
                })
            }
            VoteOutcome::Rejected { ballot } => {
                info!(guild_id = %guild_id, "Result rejected, back to playing");
                Ok(VoteReport::Rejected { voter, ballot })
            }
            VoteOutcome::Approved { ballot, result } => {
                let changes = self
                    .rating_engine
                    .commit_game(
                        &result.teams.team1,
                        &result.teams.team2,
                        result.team1_wins,
                        result.team2_wins,
                    )
                    .await
                    .map_err(|e| {
                        error!(guild_id = %guild_id, error = %e, "Rating commit failed");
                        e
                    })?;

                let record = self
                    .history
                    .append_game(NewGameRecord {
                        guild_id: session.guild_id(),
                        team1: result.teams.team1.iter().map(|p| p.id).collect(),
                        team2: result.teams.team2.iter().map(|p| p.id).collect(),
                        team1_score: result.team1_wins,
                        team2_score: result.team2_wins,
                    })
                    .await;

                // Ratings are committed at this point, so the game is over
                // even if the history log refuses the record
                session.complete();

                let record = record.map_err(|e| {
                    error!(
                        guild_id = %guild_id,
                        error = %e,
                        "Game history append failed after ratings were committed"
                    );
                    e
                })?;
                info!(guild_id = %guild_id, game_id = record.id, "Result accepted and committed");

                Ok(VoteReport::Accepted {
                    voter,
                    ballot,
                    record,
                    changes,
                })
            }
        }
    }

    /// Discards the guild's session unconditionally
    #[instrument(skip(self))]
    pub async fn cancel(&self, guild_id: GuildId) -> SessionState {
        let slot = self.slot(guild_id).await;
        let mut session = slot.lock().await;
        let dropped = session.cancel();
        info!(guild_id = %guild_id, dropped = %dropped, "Session cancelled");
        dropped
    }

    /// Copy of the guild's session, if one was ever created
    pub async fn snapshot(&self, guild_id: GuildId) -> Option<GameSession> {
        let slot = self.sessions.read().await.get(&guild_id).cloned()?;
        let session = slot.lock().await;
        Some(session.clone())
    }

    /// Cancels sessions that saw no activity for longer than `threshold`.
    ///
    /// Sessions currently handling a command are skipped.
    pub async fn expire_idle_sessions(&self, threshold: Duration) -> usize {
        let threshold = match chrono::Duration::from_std(threshold) {
            Ok(threshold) => threshold,
            Err(e) => {
                warn!(error = %e, "Idle threshold out of range, skipping expiry");
                return 0;
            }
        };
        let cutoff = Utc::now() - threshold;

        let slots: Vec<(GuildId, SessionSlot)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(guild_id, slot)| (*guild_id, Arc::clone(slot)))
            .collect();

        let mut expired = 0;
        for (guild_id, slot) in slots {
            let Ok(mut session) = slot.try_lock() else {
                debug!(guild_id = %guild_id, "Session busy, skipping expiry");
                continue;
            };
            if session.state() != SessionState::Idle && session.last_activity() < cutoff {
                let dropped = session.cancel();
                info!(guild_id = %guild_id, dropped = %dropped, "Expired idle session");
                expired += 1;
            }
        }
        expired
    }

    async fn slot(&self, guild_id: GuildId) -> SessionSlot {
        {
            let guard = self.sessions.read().await;
            if let Some(slot) = guard.get(&guild_id) {
                return Arc::clone(slot);
            }
        }

        let mut guard = self.sessions.write().await;
        guard
            .entry(guild_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(GameSession::new(guild_id))))
            .clone()
    }

    async fn lineup(&self, players: Vec<Participant>) -> Result<TeamLineup, SessionError> {
        let mut total = 0f64;
        for player in &players {
            let stored = self
                .players
                .ensure_player(player.id, &player.display_name)
                .await?;
            total += stored.rating as f64;
        }
        let average_rating = if players.is_empty() {
            0.0
        } else {
            total / players.len() as f64
        };
        Ok(TeamLineup {
            players,
            average_rating,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryGameHistoryRepository;
    use crate::player::{InMemoryPlayerRepository, PlayerModel};
    use crate::rating::CommitMode;
    use crate::shared::AppError;
    use async_trait::async_trait;

    struct Fixture {
        manager: SessionManager,
        players: Arc<InMemoryPlayerRepository>,
        history: Arc<InMemoryGameHistoryRepository>,
    }

    fn fixture() -> Fixture {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let history = Arc::new(InMemoryGameHistoryRepository::new());
        let engine = RatingEngine::new(players.clone(), CommitMode::Sequential);
        Fixture {
            manager: SessionManager::new(players.clone(), history.clone(), engine),
            players,
            history,
        }
    }

    fn player(id: i64) -> Participant {
        Participant::new(PlayerId(id), format!("player-{}", id))
    }

    async fn fill(manager: &SessionManager, guild: GuildId) -> JoinReport {
        let mut last = None;
        for id in 1..=4 {
            last = Some(manager.join(guild, player(id)).await.unwrap());
        }
        last.unwrap()
    }

    /// Player store whose writes always fail
    struct FailingWrites(InMemoryPlayerRepository);

    #[async_trait]
    impl PlayerRepository for FailingWrites {
        async fn get_player(&self, id: PlayerId) -> Result<Option<PlayerModel>, AppError> {
            self.0.get_player(id).await
        }
        async fn upsert_player(&self, _player: &PlayerModel) -> Result<(), AppError> {
            Err(AppError::DatabaseError("disk full".to_string()))
        }
        async fn ensure_player(&self, id: PlayerId, name: &str) -> Result<PlayerModel, AppError> {
            self.0.ensure_player(id, name).await
        }
        async fn list_by_rating_desc(&self) -> Result<Vec<PlayerModel>, AppError> {
            self.0.list_by_rating_desc().await
        }
    }

    #[tokio::test]
    async fn test_join_creates_player_records() {
        let f = fixture();

        let report = f.manager.join(GuildId(1), player(1)).await.unwrap();

        assert!(matches!(report, JoinReport::Joined { player_count: 1, .. }));
        assert_eq!(f.players.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_fourth_join_reports_team_averages() {
        let f = fixture();

        let report = fill(&f.manager, GuildId(1)).await;

        match report {
            JoinReport::GameStarted { team1, team2, .. } => {
                assert_eq!(team1.players.len(), 2);
                assert_eq!(team2.players.len(), 2);
                assert_eq!(team1.average_rating, 1000.0);
                assert_eq!(team2.average_rating, 1000.0);
            }
            other => panic!("Expected teams, got {:?}", other),
        }
        let session = f.manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[tokio::test]
    async fn test_guilds_are_independent() {
        let f = fixture();
        fill(&f.manager, GuildId(1)).await;

        let report = f.manager.join(GuildId(2), player(1)).await.unwrap();

        assert!(matches!(report, JoinReport::Joined { player_count: 1, .. }));
        let other = f.manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(other.state(), SessionState::Playing);
    }

    #[tokio::test]
    async fn test_consensus_commits_ratings_and_history() {
        let f = fixture();
        fill(&f.manager, GuildId(1)).await;
        let teams = f.manager.snapshot(GuildId(1)).await.unwrap().teams().cloned().unwrap();
        let reporter = teams.team1[0].id;

        f.manager
            .report_result(GuildId(1), reporter, &["3-1".to_string()])
            .await
            .unwrap();

        let voters: Vec<PlayerId> = teams
            .team1
            .iter()
            .chain(teams.team2.iter())
            .map(|p| p.id)
            .filter(|id| *id != reporter)
            .collect();
        let mut last = None;
        for voter in voters {
            last = Some(f.manager.vote(GuildId(1), voter, "yes").await.unwrap());
        }

        match last.unwrap() {
            VoteReport::Accepted { record, changes, .. } => {
                assert_eq!(record.team1_score, 1);
                assert_eq!(record.team2_score, 0);
                assert_eq!(changes.len(), 4);
            }
            other => panic!("Expected acceptance, got {:?}", other),
        }
        assert_eq!(f.history.game_count().await, 1);

        let winner = f.players.get_player(teams.team1[0].id).await.unwrap().unwrap();
        assert_eq!(winner.rating, 1064);

        let session = f.manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.roster().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_session_reporting() {
        let players = Arc::new(FailingWrites(InMemoryPlayerRepository::new()));
        let history = Arc::new(InMemoryGameHistoryRepository::new());
        let engine = RatingEngine::new(players.clone(), CommitMode::Sequential);
        let manager = SessionManager::new(players, history.clone(), engine);
        fill(&manager, GuildId(1)).await;

        manager
            .report_result(GuildId(1), PlayerId(1), &["3-1".to_string()])
            .await
            .unwrap();
        manager.vote(GuildId(1), PlayerId(2), "yes").await.unwrap();
        manager.vote(GuildId(1), PlayerId(3), "yes").await.unwrap();
        let result = manager.vote(GuildId(1), PlayerId(4), "yes").await;

        assert!(matches!(result, Err(SessionError::Storage(_))));
        assert_eq!(history.game_count().await, 0);
        let session = manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Reporting);

        manager.cancel(GuildId(1)).await;
        let session = manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    /// History log that refuses every append
    struct RefusingHistory;

    #[async_trait]
    impl GameHistoryRepository for RefusingHistory {
        async fn append_game(&self, _record: NewGameRecord) -> Result<GameRecord, AppError> {
            Err(AppError::DatabaseError("connection reset".to_string()))
        }
        async fn list_games(&self, _guild_id: GuildId) -> Result<Vec<GameRecord>, AppError> {
            Ok(Vec::new())
        }
    }

    /// Player store that fails once it has served `budget` ensure calls
    struct EnsureBudget {
        inner: InMemoryPlayerRepository,
        budget: usize,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl PlayerRepository for EnsureBudget {
        async fn get_player(&self, id: PlayerId) -> Result<Option<PlayerModel>, AppError> {
            self.inner.get_player(id).await
        }
        async fn upsert_player(&self, player: &PlayerModel) -> Result<(), AppError> {
            self.inner.upsert_player(player).await
        }
        async fn ensure_player(&self, id: PlayerId, name: &str) -> Result<PlayerModel, AppError> {
            let used = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if used >= self.budget {
                return Err(AppError::DatabaseError("too many connections".to_string()));
            }
            self.inner.ensure_player(id, name).await
        }
        async fn list_by_rating_desc(&self) -> Result<Vec<PlayerModel>, AppError> {
            self.inner.list_by_rating_desc().await
        }
    }

    async fn approve_all(manager: &SessionManager, guild: GuildId) -> Result<VoteReport, SessionError> {
        manager
            .report_result(guild, PlayerId(1), &["3-1".to_string()])
            .await?;
        manager.vote(guild, PlayerId(2), "yes").await?;
        manager.vote(guild, PlayerId(3), "yes").await?;
        manager.vote(guild, PlayerId(4), "yes").await
    }

    #[tokio::test]
    async fn test_history_failure_still_closes_the_game() {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let engine = RatingEngine::new(players.clone(), CommitMode::Sequential);
        let manager = SessionManager::new(players.clone(), Arc::new(RefusingHistory), engine);
        fill(&manager, GuildId(1)).await;

        let result = approve_all(&manager, GuildId(1)).await;

        assert!(matches!(result, Err(SessionError::Storage(_))));
        let session = manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        let rating = players.get_player(PlayerId(1)).await.unwrap().unwrap().rating;
        assert_ne!(rating, 1000);

        // The same game cannot be voted through a second time
        let again = manager
            .report_result(GuildId(1), PlayerId(1), &["3-1".to_string()])
            .await;
        assert!(matches!(again, Err(SessionError::InvalidState(_))));
        let after = players.get_player(PlayerId(1)).await.unwrap().unwrap().rating;
        assert_eq!(after, rating);
    }

    #[tokio::test]
    async fn test_failed_lineup_read_leaves_roster_filling() {
        let players = Arc::new(EnsureBudget {
            inner: InMemoryPlayerRepository::new(),
            budget: 4,
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let history = Arc::new(InMemoryGameHistoryRepository::new());
        let engine = RatingEngine::new(players.clone(), CommitMode::Sequential);
        let manager = SessionManager::new(players, history, engine);
        for id in 1..=3 {
            manager.join(GuildId(1), player(id)).await.unwrap();
        }

        // The joiner's own insert succeeds, the team rating reads do not
        let result = manager.join(GuildId(1), player(4)).await;

        assert!(matches!(result, Err(SessionError::Storage(_))));
        let session = manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Filling);
        assert_eq!(session.roster().len(), 3);
        assert!(session.teams().is_none());
    }

    #[tokio::test]
    async fn test_expire_idle_sessions() {
        let f = fixture();
        f.manager.join(GuildId(1), player(1)).await.unwrap();
        f.manager.join(GuildId(2), player(2)).await.unwrap();
        f.manager.cancel(GuildId(2)).await;

        tokio::time::sleep(Duration::from_millis(10)).await;

        let expired = f.manager.expire_idle_sessions(Duration::from_millis(1)).await;

        assert_eq!(expired, 1);
        let session = f.manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_expiry_preserves_recent_sessions() {
        let f = fixture();
        f.manager.join(GuildId(1), player(1)).await.unwrap();

        let expired = f
            .manager
            .expire_idle_sessions(Duration::from_secs(60 * 60))
            .await;

        assert_eq!(expired, 0);
        let session = f.manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.state(), SessionState::Filling);
    }

    #[tokio::test]
    async fn test_concurrent_joins_never_overfill() {
        let f = Arc::new(fixture());
        let mut handles = Vec::new();
        for id in 1..=8 {
            let f = Arc::clone(&f);
            handles.push(tokio::spawn(async move {
                f.manager.join(GuildId(1), player(id)).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 4);
        let session = f.manager.snapshot(GuildId(1)).await.unwrap();
        assert_eq!(session.roster().len(), 4);
        assert_eq!(session.state(), SessionState::Playing);
    }
}
