//! Match result propagator: turns "game finished" notifications from the game
//! lifecycle service into bracket progress.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

use super::errors::{TournamentError, TournamentResult};
use super::models::{GameCompletion, TournamentStatus};
use super::progress;
use crate::UserId;
use crate::config::EngineConfig;
use crate::db::Gateway;
use crate::db::timeouts::with_timeout;
use crate::game::GameId;

/// Receiver of game-completed notifications
#[async_trait]
pub trait GameCompletionListener: Send + Sync {
    async fn on_game_completed(
        &self,
        game_id: GameId,
        winner_id: UserId,
    ) -> TournamentResult<GameCompletion>;
}

/// Records winners of tournament-linked games
#[derive(Clone)]
pub struct MatchResultPropagator {
    gateway: Arc<dyn Gateway>,
    config: EngineConfig,
}

impl MatchResultPropagator {
    pub fn new(gateway: Arc<dyn Gateway>, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    async fn handle(&self, game_id: GameId, winner_id: UserId) -> TournamentResult<GameCompletion> {
        let mut tx = self.gateway.begin().await?;

        let Some(linked) = tx.find_match_by_game(game_id).await? else {
            debug!("Game {game_id} is not linked to a tournament match");
            return Ok(GameCompletion::NotTournamentGame);
        };

        let tournament_id = linked.key.tournament_id;
        let tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))?;

        // Re-read under the lock; another report may have landed meanwhile
        let m = tx
            .find_match(linked.key)
            .await?
            .ok_or(TournamentError::MatchNotFound(linked.key))?;

        if tournament.status == TournamentStatus::Completed {
            debug!("Ignoring game {game_id}: tournament {tournament_id} already completed");
            return Ok(GameCompletion::TournamentClosed);
        }

        match m.winner_id {
            Some(existing) if existing == winner_id => {
                debug!("Game {game_id} result for {} already recorded", m.key);
                return Ok(GameCompletion::AlreadyRecorded);
            }
            Some(existing) => {
                warn!(
                    "Game {game_id} reports winner {winner_id} but {} already has winner {existing}",
                    m.key
                );
                return Err(TournamentError::AlreadyReported(m.key));
            }
            None => {}
        }

        if tournament.status == TournamentStatus::Pending {
            warn!("Tournament {tournament_id} had a finished game while pending; marking ongoing");
            tx.set_tournament_status(tournament_id, TournamentStatus::Ongoing)
                .await?;
        }

        let outcome = progress::record_and_advance(tx.as_mut(), &tournament, &m, winner_id).await?;
        tx.commit().await?;

        info!("Game {game_id} decided {}: {outcome:?}", m.key);
        Ok(GameCompletion::Recorded(outcome))
    }
}

#[async_trait]
impl GameCompletionListener for MatchResultPropagator {
    /// Record the winner of a finished game if it belongs to a bracket match
    ///
    /// Redelivery of the same result is a no-op. The winner must be one of the
    /// match's two players, exactly as for manual reports.
    async fn on_game_completed(
        &self,
        game_id: GameId,
        winner_id: UserId,
    ) -> TournamentResult<GameCompletion> {
        with_timeout(
            self.config.transaction_timeout,
            self.handle(game_id, winner_id),
        )
        .await
    }
}
