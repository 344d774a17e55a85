//! Game data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Game ID type
pub type GameId = i64;

/// Game lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created for a bracket match, not yet played
    Pending,
    /// Being played
    InProgress,
    /// Finished
    Completed,
}

impl GameStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pending => "pending",
            GameStatus::InProgress => "in_progress",
            GameStatus::Completed => "completed",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(GameStatus::Pending),
            "in_progress" => Some(GameStatus::InProgress),
            "completed" => Some(GameStatus::Completed),
            _ => None,
        }
    }

    /// Whether a player in a game with this status is still busy
    pub fn is_active(&self) -> bool {
        !matches!(self, GameStatus::Completed)
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matchmaking mode. Only basic 1v1 is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Classic,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "classic" | "1v1" => Some(GameMode::Classic),
            _ => None,
        }
    }
}

/// Game record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub player1_id: UserId,
    pub player2_id: UserId,
    /// Score as (player1, player2)
    pub score: (i32, i32),
    pub status: GameStatus,
    pub winner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    /// Whether the user occupies either seat
    pub fn involves(&self, user_id: UserId) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }

    /// The other seat, if `user_id` is one of the players
    pub fn opponent_of(&self, user_id: UserId) -> Option<UserId> {
        if self.player1_id == user_id {
            Some(self.player2_id)
        } else if self.player2_id == user_id {
            Some(self.player1_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_status_round_trips_through_storage_names() {
        for status in [
            GameStatus::Pending,
            GameStatus::InProgress,
            GameStatus::Completed,
        ] {
            assert_eq!(GameStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(GameStatus::parse("In Progress"), None);
    }

    #[test]
    fn test_only_completed_games_are_inactive() {
        assert!(GameStatus::Pending.is_active());
        assert!(GameStatus::InProgress.is_active());
        assert!(!GameStatus::Completed.is_active());
    }

    #[test]
    fn test_opponent_of() {
        let game = Game {
            id: 1,
            player1_id: 10,
            player2_id: 20,
            score: (0, 0),
            status: GameStatus::InProgress,
            winner_id: None,
            created_at: Utc::now(),
        };
        assert!(game.involves(10));
        assert_eq!(game.opponent_of(10), Some(20));
        assert_eq!(game.opponent_of(20), Some(10));
        assert_eq!(game.opponent_of(30), None);
    }

    #[test]
    fn test_game_mode_accepts_alias() {
        assert_eq!(GameMode::parse("1v1"), Some(GameMode::Classic));
        assert_eq!(GameMode::parse("ranked"), None);
        assert_eq!(GameMode::default().as_str(), "classic");
    }
}
