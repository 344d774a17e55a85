//! Recording winners and moving them through the bracket.
//!
//! Both the manual result report and the game-completed notification end up in
//! [`record_and_advance`], so the two triggers cannot drift apart. The caller
//! must hold the tournament lock in `tx`.

use log::{debug, info};

use super::bracket;
use super::errors::{TournamentError, TournamentResult};
use super::models::{Match, RecordOutcome, Slot, Tournament, TournamentStatus};
use crate::UserId;
use crate::db::StoreTx;
use crate::game::GameStatus;

/// Decided and total matches of a round after advancing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundProgress {
    pub decided: usize,
    pub total: usize,
}

impl RoundProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.decided == self.total
    }
}

/// Set the winner of `m` and either complete the tournament or advance the round
pub(crate) async fn record_and_advance(
    tx: &mut dyn StoreTx,
    tournament: &Tournament,
    m: &Match,
    winner_id: UserId,
) -> TournamentResult<RecordOutcome> {
    if m.is_decided() {
        return Err(TournamentError::AlreadyReported(m.key));
    }
    if !m.has_player(winner_id) {
        return Err(TournamentError::InvalidWinner {
            key: m.key,
            winner: winner_id,
        });
    }
    if !tx.set_match_winner(m.key, winner_id).await? {
        return Err(TournamentError::AlreadyReported(m.key));
    }

    let final_round = bracket::round_count(tournament.size);
    if m.key.round >= final_round {
        tx.set_tournament_status(tournament.id, TournamentStatus::Completed)
            .await?;
        info!(
            "Tournament {} completed, winner {}",
            tournament.id, winner_id
        );
        return Ok(RecordOutcome::Completed);
    }

    let progress = advance_round(tx, tournament, m.key.round).await?;
    debug!(
        "Tournament {} round {}: {}/{} matches decided",
        tournament.id, m.key.round, progress.decided, progress.total
    );
    Ok(RecordOutcome::AdvancedToNext)
}

/// Push every decided winner of `round` into round `round + 1`
///
/// Works from persisted state only and is idempotent: filled slots are never
/// rewritten and a next-round match gets at most one game.
pub(crate) async fn advance_round(
    tx: &mut dyn StoreTx,
    tournament: &Tournament,
    round: u32,
) -> TournamentResult<RoundProgress> {
    let matches = tx.round_matches(tournament.id, round).await?;
    let mut decided = 0;

    for m in &matches {
        let Some(winner_id) = m.winner_id else {
            continue;
        };
        decided += 1;

        let next = bracket::next_slot(&m.key);
        match tx.find_match(next.key).await? {
            Some(existing) => {
                if existing.slot(next.side) == Slot::Unknown {
                    tx.fill_slot(next.key, next.side, winner_id).await?;
                }
            }
            None => {
                let fresh = Match::empty(next.key).with_slot(next.side, winner_id);
                if !tx.insert_match(&fresh).await? {
                    // Lost an insert race; the row exists now, only touch our side
                    tx.fill_slot(next.key, next.side, winner_id).await?;
                }
            }
        }
    }

    for next in tx.round_matches(tournament.id, round + 1).await? {
        if next.game_id.is_some() {
            continue;
        }
        if let Some((player1, player2)) = next.players() {
            let game = tx
                .create_game(player1, player2, GameStatus::Pending)
                .await?;
            tx.link_game(next.key, game.id).await?;
            info!(
                "Scheduled game {} for {} ({} vs {})",
                game.id, next.key, player1, player2
            );
        }
    }

    Ok(RoundProgress {
        decided,
        total: matches.len(),
    })
}
