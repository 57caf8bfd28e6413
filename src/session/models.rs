use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use super::errors::SessionError;
use crate::player::Participant;
use crate::shared::{GuildId, PlayerId};

/// Number of players in a full 2v2 game
pub const ROSTER_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SessionState {
    Idle,
    Filling,
    Playing,
    Reporting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Pending,
    Approve,
    Reject,
}

/// A vote value as typed by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Ballot {
    Yes,
    No,
}

impl From<Ballot> for Vote {
    fn from(ballot: Ballot) -> Self {
        match ballot {
            Ballot::Yes => Vote::Approve,
            Ballot::No => Vote::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid score `{0}`, expected two numbers like `3-1`")]
pub struct ScoreParseError(pub String);

/// Score of a single map, as "team1-team2"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapScore {
    pub team1: u32,
    pub team2: u32,
}

impl MapScore {
    /// Ties go to team 2
    pub fn team1_won(&self) -> bool {
        self.team1 > self.team2
    }
}

impl FromStr for MapScore {
    type Err = ScoreParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (left, right) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ScoreParseError(s.to_string()))?;
        let team1 = left
            .trim()
            .parse()
            .map_err(|_| ScoreParseError(s.to_string()))?;
        let team2 = right
            .trim()
            .parse()
            .map_err(|_| ScoreParseError(s.to_string()))?;
        Ok(MapScore { team1, team2 })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    pub team1: Vec<Participant>,
    pub team2: Vec<Participant>,
}

impl Teams {
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.team1
            .iter()
            .chain(self.team2.iter())
            .any(|p| p.id == player_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResult {
    pub team1_wins: u32,
    pub team2_wins: u32,
    pub reporter: PlayerId,
    /// Score tokens as reported, for echoing back
    pub scores: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { player_count: usize },
    TeamsFormed(Teams),
}

/// The agreed result once every player approved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusResult {
    pub teams: Teams,
    pub team1_wins: u32,
    pub team2_wins: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { ballot: Ballot, pending: usize },
    Rejected { ballot: Ballot },
    Approved { ballot: Ballot, result: ConsensusResult },
}

/// Per-guild game session.
///
/// All transitions are synchronous and leave the session untouched when
/// they return an error.
#[derive(Debug, Clone)]
pub struct GameSession {
    guild_id: GuildId,
    state: SessionState,
    roster: Vec<Participant>,
    teams: Option<Teams>,
    pending_result: Option<PendingResult>,
    votes: HashMap<PlayerId, Vote>,
    last_activity: DateTime<Utc>,
}

impl GameSession {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            state: SessionState::Idle,
            roster: Vec::new(),
            teams: None,
            pending_result: None,
            votes: HashMap::new(),
            last_activity: Utc::now(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn teams(&self) -> Option<&Teams> {
        self.teams.as_ref()
    }

    pub fn pending_result(&self) -> Option<&PendingResult> {
        self.pending_result.as_ref()
    }

    pub fn vote_of(&self, player_id: PlayerId) -> Option<Vote> {
        self.votes.get(&player_id).copied()
    }

    pub fn votes(&self) -> &HashMap<PlayerId, Vote> {
        &self.votes
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn participant(&self, player_id: PlayerId) -> Option<&Participant> {
        self.roster.iter().find(|p| p.id == player_id)
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn join<R: Rng + ?Sized>(
        &mut self,
        player: Participant,
        rng: &mut R,
    ) -> Result<JoinOutcome, SessionError> {
        if self.participant(player.id).is_some() {
            return Err(SessionError::DuplicateAction(
                "You're already in the game!".to_string(),
            ));
        }

        match self.state {
            SessionState::Idle | SessionState::Filling => {}
            SessionState::Playing | SessionState::Reporting => {
                return Err(SessionError::InvalidState(
                    "A game is already in progress.".to_string(),
                ));
            }
        }

        self.roster.push(player);
        self.state = SessionState::Filling;
        self.touch();

        if self.roster.len() < ROSTER_SIZE {
            return Ok(JoinOutcome::Joined {
                player_count: self.roster.len(),
            });
        }

        self.roster.shuffle(rng);
        let (first, second) = self.roster.split_at(ROSTER_SIZE / 2);
        let teams = Teams {
            team1: first.to_vec(),
            team2: second.to_vec(),
        };
        self.teams = Some(teams.clone());
        self.state = SessionState::Playing;

        Ok(JoinOutcome::TeamsFormed(teams))
    }

    /// Records a reported result and opens the vote.
    ///
    /// Reporting again while a vote is open replaces the pending result.
    pub fn report_result(
        &mut self,
        reporter: PlayerId,
        scores: &[String],
    ) -> Result<&PendingResult, SessionError> {
        if !matches!(self.state, SessionState::Playing | SessionState::Reporting) {
            return Err(SessionError::InvalidState(
                "No game is currently in progress.".to_string(),
            ));
        }
        if !self.is_team_member(reporter) {
            return Err(SessionError::NotAParticipant);
        }
        if scores.is_empty() {
            return Err(SessionError::MalformedInput(
                "Please report at least one map score, like `3-1`.".to_string(),
            ));
        }

        let maps = scores
            .iter()
            .map(|s| s.parse::<MapScore>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SessionError::MalformedInput(e.to_string()))?;

        let team1_wins = maps.iter().filter(|m| m.team1_won()).count() as u32;
        let team2_wins = maps.len() as u32 - team1_wins;

        self.votes = self
            .roster
            .iter()
            .map(|p| (p.id, Vote::Pending))
            .collect();
        self.votes.insert(reporter, Vote::Approve);
        self.state = SessionState::Reporting;
        self.touch();

        Ok(self.pending_result.insert(PendingResult {
            team1_wins,
            team2_wins,
            reporter,
            scores: scores.to_vec(),
        }))
    }

    pub fn vote(&mut self, voter: PlayerId, raw: &str) -> Result<VoteOutcome, SessionError> {
        match self.state {
            SessionState::Reporting => {}
            SessionState::Playing => {
                return Err(SessionError::InvalidState(
                    "No game result is awaiting votes.".to_string(),
                ));
            }
            SessionState::Idle | SessionState::Filling => {
                return Err(SessionError::InvalidState(
                    "No game is currently in progress.".to_string(),
                ));
            }
        }

        match self.votes.get(&voter) {
            None => return Err(SessionError::NotAParticipant),
            Some(Vote::Pending) => {}
            Some(_) => {
                return Err(SessionError::DuplicateAction(
                    "You have already voted.".to_string(),
                ));
            }
        }

        let ballot: Ballot = raw.trim().parse().map_err(|_| {
            SessionError::MalformedInput("Vote must be 'yes' or 'no'.".to_string())
        })?;

        self.votes.insert(voter, ballot.into());
        self.touch();

        if self.votes.values().any(|v| *v == Vote::Reject) {
            self.pending_result = None;
            self.votes.clear();
            self.state = SessionState::Playing;
            return Ok(VoteOutcome::Rejected { ballot });
        }

        let pending = self.votes.values().filter(|v| **v == Vote::Pending).count();
        if pending > 0 {
            return Ok(VoteOutcome::Recorded { ballot, pending });
        }

        match (&self.teams, &self.pending_result) {
            (Some(teams), Some(result)) => Ok(VoteOutcome::Approved {
                ballot,
                result: ConsensusResult {
                    teams: teams.clone(),
                    team1_wins: result.team1_wins,
                    team2_wins: result.team2_wins,
                },
            }),
            _ => Err(SessionError::InvalidState(
                "No game result is awaiting votes.".to_string(),
            )),
        }
    }

    /// Returns the session to Idle once an approved result has been persisted
    pub fn complete(&mut self) {
        self.reset();
    }

    /// Discards everything, whatever the state. Returns the state that was dropped.
    pub fn cancel(&mut self) -> SessionState {
        let previous = self.state;
        self.reset();
        previous
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.roster.clear();
        self.teams = None;
        self.pending_result = None;
        self.votes.clear();
        self.touch();
    }

    fn is_team_member(&self, player_id: PlayerId) -> bool {
        self.teams
            .as_ref()
            .map(|t| t.contains(player_id))
            .unwrap_or(false)
    }
}
