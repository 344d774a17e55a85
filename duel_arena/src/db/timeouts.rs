//! Deadlines for gateway transactions
//!
//! Wrapping a transaction future in [`with_timeout`] drops it on expiry, which
//! rolls the transaction back and releases its locks.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use super::errors::StoreError;

/// Default timeout for a whole transaction (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute an operation with a deadline
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * The operation's own result, or `StoreError::Timeout` converted into `E`
///
/// # Example
///
/// ```no_run
/// use duel_arena::db::timeouts::{with_timeout, DEFAULT_TRANSACTION_TIMEOUT};
/// use duel_arena::db::StoreError;
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), StoreError> {
///
/// let rows = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
///     Ok::<_, StoreError>(sqlx::query("SELECT 1").execute(pool).await?)
/// })
/// .await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<StoreError>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(duration).into()),
    }
}
