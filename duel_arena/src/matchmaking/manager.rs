//! FIFO matchmaking queue.

use log::{debug, info};
use std::sync::Arc;

use super::errors::{QueueError, QueueResult};
use super::models::{EnqueueOutcome, QueueStatus};
use crate::UserId;
use crate::config::EngineConfig;
use crate::db::Gateway;
use crate::db::timeouts::with_timeout;
use crate::game::{GameMode, GameStatus};

/// Pairs waiting users into games, longest-waiting first
#[derive(Clone)]
pub struct MatchmakingQueue {
    gateway: Arc<dyn Gateway>,
    config: EngineConfig,
}

impl MatchmakingQueue {
    pub fn new(gateway: Arc<dyn Gateway>, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    /// Join the queue, or get paired with the earliest waiting user
    ///
    /// # Errors
    ///
    /// * `QueueError::AlreadyInGame` - the user has a game that is not completed
    pub async fn enqueue(&self, user_id: UserId, mode: GameMode) -> QueueResult<EnqueueOutcome> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.begin().await?;
            tx.lock_queue().await?;

            if let Some(game) = tx.active_game_for(user_id).await? {
                return Err(QueueError::AlreadyInGame(game.id));
            }

            if tx.queue_entry(user_id).await?.is_some() {
                debug!("User {user_id} is already queued");
                return Ok(EnqueueOutcome::Queued);
            }

            let Some(opponent) = tx.oldest_waiting_except(user_id).await? else {
                tx.insert_queue_entry(user_id, mode).await?;
                tx.commit().await?;
                info!("User {user_id} queued for {}", mode.as_str());
                return Ok(EnqueueOutcome::Queued);
            };

            tx.remove_queue_entry(opponent.user_id).await?;
            let game = tx
                .create_game(opponent.user_id, user_id, GameStatus::InProgress)
                .await?;
            tx.commit().await?;

            info!(
                "Matched user {} with user {} in game {}",
                opponent.user_id, user_id, game.id
            );
            Ok(EnqueueOutcome::Matched {
                opponent_id: opponent.user_id,
                game,
            })
        })
        .await
    }

    /// Leave the queue. Returns whether an entry was removed.
    pub async fn dequeue(&self, user_id: UserId) -> QueueResult<bool> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.begin().await?;
            tx.lock_queue().await?;
            let removed = tx.remove_queue_entry(user_id).await?;
            tx.commit().await?;

            if removed {
                info!("User {user_id} left the queue");
            }
            Ok(removed)
        })
        .await
    }

    /// Idle, queued or matched, for UI polling
    pub async fn status(&self, user_id: UserId) -> QueueResult<QueueStatus> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.snapshot().await?;

            if let Some(entry) = tx.queue_entry(user_id).await? {
                return Ok(QueueStatus::Queued {
                    since: entry.queued_at,
                });
            }
            if let Some(game) = tx.active_game_for(user_id).await? {
                return Ok(QueueStatus::Matched { game_id: game.id });
            }
            Ok(QueueStatus::Idle)
        })
        .await
    }
}
