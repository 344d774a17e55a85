//! Tournament data models for single-elimination brackets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;
use crate::game::GameId;

/// Tournament ID type
pub type TournamentId = i64;

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting participants
    Pending,
    /// Bracket seeded, matches being played
    Ongoing,
    /// Final match decided
    Completed,
}

impl TournamentStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Pending => "pending",
            TournamentStatus::Ongoing => "ongoing",
            TournamentStatus::Completed => "completed",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TournamentStatus::Pending),
            "ongoing" => Some(TournamentStatus::Ongoing),
            "completed" => Some(TournamentStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentType {
    #[default]
    SingleElimination,
}

impl TournamentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentType::SingleElimination => "single_elimination",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single_elimination" => Some(TournamentType::SingleElimination),
            _ => None,
        }
    }
}

/// Tournament row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub tournament_type: TournamentType,
    /// Number of participants the bracket is built for
    pub size: u32,
    pub status: TournamentStatus,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub tournament_type: TournamentType,
    pub size: u32,
    pub owner_id: UserId,
}

impl NewTournament {
    /// Single-elimination tournament for `size` players
    pub fn single_elimination(name: impl Into<String>, size: u32, owner_id: UserId) -> Self {
        Self {
            name: name.into(),
            tournament_type: TournamentType::SingleElimination,
            size,
            owner_id,
        }
    }
}

/// Tournament participant. Join order is seeding order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub nickname: String,
    pub joined_at: DateTime<Utc>,
}

/// Player side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    P1,
    P2,
}

/// A player slot, unknown until the feeder match is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<UserId>", into = "Option<UserId>")]
pub enum Slot {
    #[default]
    Unknown,
    Filled(UserId),
}

impl Slot {
    pub fn user(&self) -> Option<UserId> {
        match self {
            Slot::Unknown => None,
            Slot::Filled(user_id) => Some(*user_id),
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }
}

impl From<Option<UserId>> for Slot {
    fn from(value: Option<UserId>) -> Self {
        value.map_or(Slot::Unknown, Slot::Filled)
    }
}

impl From<Slot> for Option<UserId> {
    fn from(slot: Slot) -> Self {
        slot.user()
    }
}

/// Composite match key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey {
    pub tournament_id: TournamentId,
    /// 1-indexed round
    pub round: u32,
    /// 0-indexed position within the round
    pub index: u32,
}

impl MatchKey {
    pub fn new(tournament_id: TournamentId, round: u32, index: u32) -> Self {
        Self {
            tournament_id,
            round,
            index,
        }
    }
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tournament {} round {} match {}",
            self.tournament_id, self.round, self.index
        )
    }
}

/// Bracket match row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub key: MatchKey,
    pub game_id: Option<GameId>,
    pub player1: Slot,
    pub player2: Slot,
    /// Write-once
    pub winner_id: Option<UserId>,
}

impl Match {
    /// Match with no players known yet
    pub fn empty(key: MatchKey) -> Self {
        Self {
            key,
            game_id: None,
            player1: Slot::Unknown,
            player2: Slot::Unknown,
            winner_id: None,
        }
    }

    /// Round-1 match with both players and its game
    pub fn seeded(key: MatchKey, player1: UserId, player2: UserId, game_id: GameId) -> Self {
        Self {
            key,
            game_id: Some(game_id),
            player1: Slot::Filled(player1),
            player2: Slot::Filled(player2),
            winner_id: None,
        }
    }

    pub fn slot(&self, side: Side) -> Slot {
        match side {
            Side::P1 => self.player1,
            Side::P2 => self.player2,
        }
    }

    pub fn with_slot(mut self, side: Side, user_id: UserId) -> Self {
        match side {
            Side::P1 => self.player1 = Slot::Filled(user_id),
            Side::P2 => self.player2 = Slot::Filled(user_id),
        }
        self
    }

    /// Both players, once known
    pub fn players(&self) -> Option<(UserId, UserId)> {
        match (self.player1, self.player2) {
            (Slot::Filled(p1), Slot::Filled(p2)) => Some((p1, p2)),
            _ => None,
        }
    }

    /// Whether `user_id` sits in either slot
    pub fn has_player(&self, user_id: UserId) -> bool {
        self.player1 == Slot::Filled(user_id) || self.player2 == Slot::Filled(user_id)
    }

    pub fn is_decided(&self) -> bool {
        self.winner_id.is_some()
    }
}

/// Result of starting a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSummary {
    pub rounds: u32,
    pub matches_created: u32,
}

/// Result of recording a match winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Winner moved into the next round
    AdvancedToNext,
    /// Final decided, tournament completed
    Completed,
}

/// Result of handling a game-completed notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameCompletion {
    /// The game is not linked to any bracket match
    NotTournamentGame,
    /// The tournament was already completed
    TournamentClosed,
    /// The same winner had already been recorded
    AlreadyRecorded,
    Recorded(RecordOutcome),
}

/// Seat in the bracket view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSeat {
    pub user_id: UserId,
    /// `None` when the user is no longer on the roster
    pub nickname: Option<String>,
}

/// Match in the bracket view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketMatch {
    pub round: u32,
    pub index: u32,
    pub game_id: Option<GameId>,
    pub player1: Option<BracketSeat>,
    pub player2: Option<BracketSeat>,
    pub winner_id: Option<UserId>,
}

/// Read-only view of the whole bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    pub rounds: u32,
    /// Ordered by round, then index
    pub matches: Vec<BracketMatch>,
}

impl BracketView {
    /// Matches of one round, in index order
    pub fn round(&self, round: u32) -> impl Iterator<Item = &BracketMatch> {
        self.matches.iter().filter(move |m| m.round == round)
    }

    /// Winner of the final, if decided
    pub fn champion(&self) -> Option<UserId> {
        self.round(self.rounds).next().and_then(|m| m.winner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_storage_names() {
        for status in [
            TournamentStatus::Pending,
            TournamentStatus::Ongoing,
            TournamentStatus::Completed,
        ] {
            assert_eq!(TournamentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TournamentStatus::parse("running"), None);
    }

    #[test]
    fn test_slot_option_conversions() {
        assert_eq!(Slot::from(None), Slot::Unknown);
        assert_eq!(Slot::from(Some(7)), Slot::Filled(7));
        assert_eq!(Option::<UserId>::from(Slot::Filled(7)), Some(7));
        assert!(!Slot::Unknown.is_filled());
    }

    #[test]
    fn test_slot_serializes_as_nullable_id() {
        let m = Match::empty(MatchKey::new(1, 2, 0)).with_slot(Side::P1, 42);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["player1"], 42);
        assert!(json["player2"].is_null());
    }

    #[test]
    fn test_match_players_and_membership() {
        let key = MatchKey::new(1, 1, 0);
        let m = Match::seeded(key, 10, 20, 99);
        assert_eq!(m.players(), Some((10, 20)));
        assert!(m.has_player(10));
        assert!(m.has_player(20));
        assert!(!m.has_player(30));
        assert!(!m.is_decided());

        let half = Match::empty(key).with_slot(Side::P2, 20);
        assert_eq!(half.players(), None);
        assert_eq!(half.slot(Side::P1), Slot::Unknown);
        assert_eq!(half.slot(Side::P2), Slot::Filled(20));
    }

    #[test]
    fn test_match_key_ordering_is_round_then_index() {
        let mut keys = vec![
            MatchKey::new(1, 2, 0),
            MatchKey::new(1, 1, 1),
            MatchKey::new(1, 1, 0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                MatchKey::new(1, 1, 0),
                MatchKey::new(1, 1, 1),
                MatchKey::new(1, 2, 0),
            ]
        );
    }
}
