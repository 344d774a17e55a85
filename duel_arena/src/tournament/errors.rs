//! Tournament error types.

use thiserror::Error;

use super::models::{MatchKey, TournamentId, TournamentStatus};
use crate::UserId;
use crate::db::StoreError;

/// Tournament errors
///
/// Every variant except [`TournamentError::Store`] is a rejected request the
/// caller can act on; `Store` means the system itself failed.
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("User {caller} does not own tournament {tournament_id}")]
    Forbidden {
        tournament_id: TournamentId,
        caller: UserId,
    },

    #[error("Tournament already started")]
    AlreadyStarted,

    #[error("Tournament size {0} is not a power of two")]
    SizeNotPowerOfTwo(u32),

    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    #[error("Tournament is not ongoing (status: {0})")]
    NotOngoing(TournamentStatus),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchKey),

    #[error("Result already reported for {0}")]
    AlreadyReported(MatchKey),

    #[error("User {winner} is not a player of {key}")]
    InvalidWinner { key: MatchKey, winner: UserId },

    #[error("Invalid tournament size {size}: must be between 2 and {max}")]
    InvalidSize { size: u32, max: u32 },

    #[error("Tournament name must not be empty")]
    InvalidName,

    #[error("Tournament is full")]
    TournamentFull,

    #[error("User already joined")]
    AlreadyJoined,

    #[error("User is not a participant")]
    NotParticipant,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TournamentError {
    /// Stable error code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            TournamentError::NotFound(_) => "NOT_FOUND",
            TournamentError::Forbidden { .. } => "FORBIDDEN",
            TournamentError::AlreadyStarted => "ALREADY_STARTED",
            TournamentError::SizeNotPowerOfTwo(_) => "SIZE_NOT_POWER_OF_TWO",
            TournamentError::InsufficientParticipants { .. } => "INSUFFICIENT_PARTICIPANTS",
            TournamentError::NotOngoing(_) => "NOT_ONGOING",
            TournamentError::MatchNotFound(_) => "MATCH_NOT_FOUND",
            TournamentError::AlreadyReported(_) => "ALREADY_REPORTED",
            TournamentError::InvalidWinner { .. } => "INVALID_WINNER",
            TournamentError::InvalidSize { .. } => "INVALID_SIZE",
            TournamentError::InvalidName => "INVALID_NAME",
            TournamentError::TournamentFull => "TOURNAMENT_FULL",
            TournamentError::AlreadyJoined => "ALREADY_JOINED",
            TournamentError::NotParticipant => "NOT_PARTICIPANT",
            TournamentError::Store(_) => "SERVER_ERROR",
        }
    }

    /// Whether the failure is the system's rather than the request's
    pub fn is_server_error(&self) -> bool {
        matches!(self, TournamentError::Store(_))
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Store(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
