//! Tournament manager: creation, roster, seeding, result reporting and the
//! bracket view.

use log::{info, warn};
use std::sync::Arc;

use super::bracket;
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    BracketView, Match, MatchKey, NewTournament, Participant, RecordOutcome, StartSummary,
    Tournament, TournamentId, TournamentStatus,
};
use super::{progress, reader};
use crate::UserId;
use crate::config::EngineConfig;
use crate::db::Gateway;
use crate::db::timeouts::with_timeout;
use crate::game::GameStatus;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    gateway: Arc<dyn Gateway>,
    config: EngineConfig,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(gateway: Arc<dyn Gateway>, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    /// Create a pending tournament
    ///
    /// Sizes that are not powers of two are accepted here and rejected at start.
    pub async fn create_tournament(&self, new: NewTournament) -> TournamentResult<Tournament> {
        if new.name.trim().is_empty() {
            return Err(TournamentError::InvalidName);
        }
        if new.size < 2 || new.size > self.config.max_tournament_size {
            return Err(TournamentError::InvalidSize {
                size: new.size,
                max: self.config.max_tournament_size,
            });
        }

        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.begin().await?;
            let tournament = tx.insert_tournament(&new).await?;
            tx.commit().await?;

            info!(
                "Created tournament {} '{}' (size {}, owner {})",
                tournament.id, tournament.name, tournament.size, tournament.owner_id
            );
            Ok(tournament)
        })
        .await
    }

    /// Add a user to a pending tournament
    pub async fn join_tournament(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        nickname: &str,
    ) -> TournamentResult<()> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.begin().await?;
            let tournament = tx
                .lock_tournament(tournament_id)
                .await?
                .ok_or(TournamentError::NotFound(tournament_id))?;

            if tournament.status != TournamentStatus::Pending {
                return Err(TournamentError::AlreadyStarted);
            }

            let joined = tx.participants(tournament_id).await?;
            if joined.iter().any(|p| p.user_id == user_id) {
                return Err(TournamentError::AlreadyJoined);
            }
            if joined.len() >= tournament.size as usize {
                return Err(TournamentError::TournamentFull);
            }

            if !tx
                .insert_participant(tournament_id, user_id, nickname)
                .await?
            {
                return Err(TournamentError::AlreadyJoined);
            }
            tx.commit().await?;

            info!("User {user_id} joined tournament {tournament_id}");
            Ok(())
        })
        .await
    }

    /// Remove a user from a pending tournament
    pub async fn leave_tournament(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<()> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.begin().await?;
            let tournament = tx
                .lock_tournament(tournament_id)
                .await?
                .ok_or(TournamentError::NotFound(tournament_id))?;

            if tournament.status != TournamentStatus::Pending {
                return Err(TournamentError::AlreadyStarted);
            }
            if !tx.remove_participant(tournament_id, user_id).await? {
                return Err(TournamentError::NotParticipant);
            }
            tx.commit().await?;

            info!("User {user_id} left tournament {tournament_id}");
            Ok(())
        })
        .await
    }

    /// Seed round 1 and move the tournament to ongoing
    ///
    /// # Errors
    ///
    /// Checked in this order: `NotFound`, `Forbidden` (caller is not the owner),
    /// `AlreadyStarted`, `SizeNotPowerOfTwo`, `InsufficientParticipants`
    /// (the roster must match the size exactly).
    pub async fn start_tournament(
        &self,
        tournament_id: TournamentId,
        caller_id: UserId,
    ) -> TournamentResult<StartSummary> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.begin().await?;
            let tournament = tx
                .lock_tournament(tournament_id)
                .await?
                .ok_or(TournamentError::NotFound(tournament_id))?;

            if tournament.owner_id != caller_id {
                return Err(TournamentError::Forbidden {
                    tournament_id,
                    caller: caller_id,
                });
            }
            if tournament.status != TournamentStatus::Pending {
                return Err(TournamentError::AlreadyStarted);
            }
            let rounds = bracket::rounds_for(tournament.size)
                .ok_or(TournamentError::SizeNotPowerOfTwo(tournament.size))?;

            let participants = tx.participants(tournament_id).await?;
            if participants.len() != tournament.size as usize {
                return Err(TournamentError::InsufficientParticipants {
                    needed: tournament.size as usize,
                    current: participants.len(),
                });
            }

            let mut matches_created = 0;
            for (index, player1, player2) in bracket::seed_pairs(&participants) {
                let game = tx
                    .create_game(player1, player2, GameStatus::Pending)
                    .await?;
                let key = MatchKey::new(tournament_id, 1, index);
                if !tx
                    .insert_match(&Match::seeded(key, player1, player2, game.id))
                    .await?
                {
                    // A round-1 row for a pending tournament means a seeding already happened
                    return Err(TournamentError::AlreadyStarted);
                }
                matches_created += 1;
            }

            tx.set_tournament_status(tournament_id, TournamentStatus::Ongoing)
                .await?;
            tx.commit().await?;

            info!(
                "Started tournament {tournament_id}: {rounds} rounds, {matches_created} opening matches"
            );
            Ok(StartSummary {
                rounds,
                matches_created,
            })
        })
        .await
    }

    /// Record the winner of a match and propagate it
    ///
    /// Any caller may report; use [`Self::record_match_result_as`] to require
    /// the tournament owner.
    ///
    /// # Errors
    ///
    /// Checked in this order: `NotFound`, `NotOngoing`, `MatchNotFound`,
    /// `AlreadyReported`, `InvalidWinner`.
    pub async fn record_match_result(
        &self,
        tournament_id: TournamentId,
        round: u32,
        index: u32,
        winner_id: UserId,
    ) -> TournamentResult<RecordOutcome> {
        self.record(None, MatchKey::new(tournament_id, round, index), winner_id)
            .await
    }

    /// Like [`Self::record_match_result`], but only the owner may report
    pub async fn record_match_result_as(
        &self,
        caller_id: UserId,
        tournament_id: TournamentId,
        round: u32,
        index: u32,
        winner_id: UserId,
    ) -> TournamentResult<RecordOutcome> {
        self.record(
            Some(caller_id),
            MatchKey::new(tournament_id, round, index),
            winner_id,
        )
        .await
    }

    async fn record(
        &self,
        caller_id: Option<UserId>,
        key: MatchKey,
        winner_id: UserId,
    ) -> TournamentResult<RecordOutcome> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.begin().await?;
            let tournament = tx
                .lock_tournament(key.tournament_id)
                .await?
                .ok_or(TournamentError::NotFound(key.tournament_id))?;

            if let Some(caller) = caller_id {
                if caller != tournament.owner_id {
                    warn!(
                        "User {caller} tried to report {key} without owning the tournament"
                    );
                    return Err(TournamentError::Forbidden {
                        tournament_id: tournament.id,
                        caller,
                    });
                }
            }
            if tournament.status != TournamentStatus::Ongoing {
                return Err(TournamentError::NotOngoing(tournament.status));
            }
            if !bracket::is_valid_key(tournament.size, &key) {
                return Err(TournamentError::MatchNotFound(key));
            }

            let m = tx
                .find_match(key)
                .await?
                .ok_or(TournamentError::MatchNotFound(key))?;

            let outcome =
                progress::record_and_advance(tx.as_mut(), &tournament, &m, winner_id).await?;
            tx.commit().await?;

            info!("Recorded winner {winner_id} for {key}: {outcome:?}");
            Ok(outcome)
        })
        .await
    }

    /// Full bracket with nicknames, from one consistent snapshot
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> TournamentResult<BracketView> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.snapshot().await?;
            reader::read_bracket(tx.as_mut(), tournament_id).await
        })
        .await
    }

    /// Get tournament information
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.snapshot().await?;
            tx.tournament(tournament_id)
                .await?
                .ok_or(TournamentError::NotFound(tournament_id))
        })
        .await
    }

    /// List tournaments, newest first
    pub async fn list_tournaments(
        &self,
        status_filter: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.snapshot().await?;
            Ok(tx.list_tournaments(status_filter).await?)
        })
        .await
    }

    /// Participants in join (seeding) order
    pub async fn participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Participant>> {
        with_timeout(self.config.transaction_timeout, async {
            let mut tx = self.gateway.snapshot().await?;
            if tx.tournament(tournament_id).await?.is_none() {
                return Err(TournamentError::NotFound(tournament_id));
            }
            Ok(tx.participants(tournament_id).await?)
        })
        .await
    }
}
