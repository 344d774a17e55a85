//! Matchmaking data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;
use crate::game::{Game, GameId, GameMode};

/// A user waiting for an opponent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub mode: GameMode,
    pub queued_at: DateTime<Utc>,
}

/// Result of joining the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    /// Now waiting, or was already waiting
    Queued,
    /// Paired with the longest-waiting user, who plays as player 1
    Matched { opponent_id: UserId, game: Game },
}

impl EnqueueOutcome {
    /// Whether the user is waiting after the call
    pub fn is_queued(&self) -> bool {
        matches!(self, EnqueueOutcome::Queued)
    }

    pub fn game_id(&self) -> Option<GameId> {
        match self {
            EnqueueOutcome::Matched { game, .. } => Some(game.id),
            _ => None,
        }
    }
}

/// Where a user stands, for polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueueStatus {
    Idle,
    Queued { since: DateTime<Utc> },
    Matched { game_id: GameId },
}
