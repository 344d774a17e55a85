//! Engine configuration.

use std::time::Duration;

use crate::db::config::parse_env_or;
use crate::db::timeouts::DEFAULT_TRANSACTION_TIMEOUT;

/// Largest bracket accepted by default
pub const DEFAULT_MAX_TOURNAMENT_SIZE: u32 = 64;

/// Settings shared by the tournament manager, propagator and matchmaking queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline for one operation, including waiting for locks
    pub transaction_timeout: Duration,
    /// Largest tournament size accepted at creation
    pub max_tournament_size: u32,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// - `ARENA_TRANSACTION_TIMEOUT_SECS` (default: 10)
    /// - `ARENA_MAX_TOURNAMENT_SIZE` (default: 64)
    pub fn from_env() -> Self {
        Self {
            transaction_timeout: Duration::from_secs(parse_env_or(
                "ARENA_TRANSACTION_TIMEOUT_SECS",
                DEFAULT_TRANSACTION_TIMEOUT.as_secs(),
            )),
            max_tournament_size: parse_env_or(
                "ARENA_MAX_TOURNAMENT_SIZE",
                DEFAULT_MAX_TOURNAMENT_SIZE,
            ),
        }
    }

    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn with_max_tournament_size(mut self, size: u32) -> Self {
        self.max_tournament_size = size;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
            max_tournament_size: DEFAULT_MAX_TOURNAMENT_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.transaction_timeout, Duration::from_secs(10));
        assert_eq!(config.max_tournament_size, 64);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_transaction_timeout(Duration::from_millis(250))
            .with_max_tournament_size(8);
        assert_eq!(config.transaction_timeout, Duration::from_millis(250));
        assert_eq!(config.max_tournament_size, 8);
    }
}
