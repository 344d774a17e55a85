//! Matchmaking error types.

use thiserror::Error;

use crate::db::StoreError;
use crate::game::GameId;

/// Matchmaking errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// User has a game that is not completed
    #[error("Already in game {0}")]
    AlreadyInGame(GameId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueueError {
    /// Stable error code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            QueueError::AlreadyInGame(_) => "ALREADY_IN_GAME",
            QueueError::Store(_) => "SERVER_ERROR",
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, QueueError::Store(_))
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            QueueError::Store(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for matchmaking operations
pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(QueueError::AlreadyInGame(3).code(), "ALREADY_IN_GAME");
        let err = QueueError::from(StoreError::corrupt("mode", "ranked"));
        assert_eq!(err.code(), "SERVER_ERROR");
        assert!(err.is_server_error());
        assert_eq!(err.client_message(), "Internal server error");
    }
}
