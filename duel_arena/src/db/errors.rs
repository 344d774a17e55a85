//! Storage error types.

use std::time::Duration;
use thiserror::Error;

/// Failures of the persistence gateway itself, as opposed to rejected requests
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Operation exceeded its deadline and was rolled back
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored value could not be decoded
    #[error("Corrupt {column} value: {value}")]
    Corrupt { column: &'static str, value: String },
}

impl StoreError {
    pub(crate) fn corrupt(column: &'static str, value: impl ToString) -> Self {
        StoreError::Corrupt {
            column,
            value: value.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = StoreError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_corrupt_display_names_column() {
        let err = StoreError::corrupt("status", "running");
        assert_eq!(err.to_string(), "Corrupt status value: running");
    }
}
