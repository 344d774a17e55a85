//! In-process implementation of the persistence gateway.
//!
//! A transaction holds the single state mutex from `begin` until it is
//! committed or dropped, so transactions are fully serialized. Writes go to a
//! private copy that replaces the shared state only on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::errors::StoreResult;
use super::gateway::{Gateway, StoreTx};
use crate::UserId;
use crate::game::{Game, GameId, GameMode, GameStatus};
use crate::matchmaking::QueueEntry;
use crate::tournament::{
    Match, MatchKey, NewTournament, Participant, Side, Slot, Tournament, TournamentId,
    TournamentStatus,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tournaments: BTreeMap<TournamentId, Tournament>,
    participants: Vec<Participant>,
    matches: BTreeMap<MatchKey, Match>,
    games: BTreeMap<GameId, Game>,
    queue: Vec<QueueEntry>,
    last_tournament_id: TournamentId,
    last_game_id: GameId,
}

/// Gateway keeping every row in memory
#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish a game the way the game lifecycle service would
    pub async fn complete_game(&self, game_id: GameId, winner_id: UserId) -> Option<Game> {
        let mut state = self.state.lock().await;
        let game = state.games.get_mut(&game_id)?;
        game.status = GameStatus::Completed;
        game.winner_id = Some(winner_id);
        Some(game.clone())
    }

    pub async fn game(&self, game_id: GameId) -> Option<Game> {
        self.state.lock().await.games.get(&game_id).cloned()
    }

    /// Every game, in creation order
    pub async fn games(&self) -> Vec<Game> {
        self.state.lock().await.games.values().cloned().collect()
    }

    /// Number of users currently waiting
    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_tournament(&mut self, new: &NewTournament) -> StoreResult<Tournament> {
        self.work.last_tournament_id += 1;
        let tournament = Tournament {
            id: self.work.last_tournament_id,
            name: new.name.clone(),
            tournament_type: new.tournament_type,
            size: new.size,
            status: TournamentStatus::Pending,
            owner_id: new.owner_id,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        self.work
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.work.tournaments.get(&id).cloned())
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        // The transaction already holds the whole store
        self.tournament(id).await
    }

    async fn list_tournaments(
        &mut self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        let mut tournaments: Vec<Tournament> = self
            .work
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tournaments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tournaments)
    }

    async fn set_tournament_status(
        &mut self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> StoreResult<()> {
        if let Some(tournament) = self.work.tournaments.get_mut(&id) {
            tournament.status = status;
            match status {
                TournamentStatus::Ongoing => {
                    tournament.started_at.get_or_insert_with(Utc::now);
                }
                TournamentStatus::Completed => {
                    tournament.finished_at.get_or_insert_with(Utc::now);
                }
                TournamentStatus::Pending => {}
            }
        }
        Ok(())
    }

    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
        nickname: &str,
    ) -> StoreResult<bool> {
        let exists = self
            .work
            .participants
            .iter()
            .any(|p| p.tournament_id == tournament_id && p.user_id == user_id);
        if exists {
            return Ok(false);
        }

        self.work.participants.push(Participant {
            tournament_id,
            user_id,
            nickname: nickname.to_string(),
            joined_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<bool> {
        let before = self.work.participants.len();
        self.work
            .participants
            .retain(|p| !(p.tournament_id == tournament_id && p.user_id == user_id));
        Ok(self.work.participants.len() < before)
    }

    async fn participants(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Participant>> {
        Ok(self
            .work
            .participants
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn insert_match(&mut self, m: &Match) -> StoreResult<bool> {
        if self.work.matches.contains_key(&m.key) {
            return Ok(false);
        }
        self.work.matches.insert(m.key, m.clone());
        Ok(true)
    }

    async fn find_match(&mut self, key: MatchKey) -> StoreResult<Option<Match>> {
        Ok(self.work.matches.get(&key).cloned())
    }

    async fn find_match_by_game(&mut self, game_id: GameId) -> StoreResult<Option<Match>> {
        Ok(self
            .work
            .matches
            .values()
            .find(|m| m.game_id == Some(game_id))
            .cloned())
    }

    async fn round_matches(
        &mut self,
        tournament_id: TournamentId,
        round: u32,
    ) -> StoreResult<Vec<Match>> {
        Ok(self
            .work
            .matches
            .values()
            .filter(|m| m.key.tournament_id == tournament_id && m.key.round == round)
            .cloned()
            .collect())
    }

    async fn bracket_matches(&mut self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        Ok(self
            .work
            .matches
            .values()
            .filter(|m| m.key.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn fill_slot(&mut self, key: MatchKey, side: Side, user_id: UserId) -> StoreResult<()> {
        if let Some(m) = self.work.matches.get_mut(&key) {
            match side {
                Side::P1 => m.player1 = Slot::Filled(user_id),
                Side::P2 => m.player2 = Slot::Filled(user_id),
            }
        }
        Ok(())
    }

    async fn set_match_winner(&mut self, key: MatchKey, winner_id: UserId) -> StoreResult<bool> {
        match self.work.matches.get_mut(&key) {
            Some(m) if m.winner_id.is_none() => {
                m.winner_id = Some(winner_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn link_game(&mut self, key: MatchKey, game_id: GameId) -> StoreResult<()> {
        if let Some(m) = self.work.matches.get_mut(&key) {
            m.game_id = Some(game_id);
        }
        Ok(())
    }

    async fn create_game(
        &mut self,
        player1_id: UserId,
        player2_id: UserId,
        status: GameStatus,
    ) -> StoreResult<Game> {
        self.work.last_game_id += 1;
        let game = Game {
            id: self.work.last_game_id,
            player1_id,
            player2_id,
            score: (0, 0),
            status,
            winner_id: None,
            created_at: Utc::now(),
        };
        self.work.games.insert(game.id, game.clone());
        Ok(game)
    }

    async fn active_game_for(&mut self, user_id: UserId) -> StoreResult<Option<Game>> {
        Ok(self
            .work
            .games
            .values()
            .rev()
            .find(|g| g.status.is_active() && g.involves(user_id))
            .cloned())
    }

    async fn lock_queue(&mut self) -> StoreResult<()> {
        Ok(())
    }

    async fn queue_entry(&mut self, user_id: UserId) -> StoreResult<Option<QueueEntry>> {
        Ok(self
            .work
            .queue
            .iter()
            .find(|e| e.user_id == user_id)
            .cloned())
    }

    async fn oldest_waiting_except(
        &mut self,
        user_id: UserId,
    ) -> StoreResult<Option<QueueEntry>> {
        Ok(self
            .work
            .queue
            .iter()
            .find(|e| e.user_id != user_id)
            .cloned())
    }

    async fn insert_queue_entry(&mut self, user_id: UserId, mode: GameMode) -> StoreResult<bool> {
        if self.work.queue.iter().any(|e| e.user_id == user_id) {
            return Ok(false);
        }
        self.work.queue.push(QueueEntry {
            user_id,
            mode,
            queued_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove_queue_entry(&mut self, user_id: UserId) -> StoreResult<bool> {
        let before = self.work.queue.len();
        self.work.queue.retain(|e| e.user_id != user_id);
        Ok(self.work.queue.len() < before)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let gateway = MemoryGateway::new();

        {
            let mut tx = gateway.begin().await.unwrap();
            tx.insert_tournament(&NewTournament::single_elimination("dropped", 4, 1))
                .await
                .unwrap();
        }

        let mut tx = gateway.begin().await.unwrap();
        assert!(tx.list_tournaments(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let gateway = MemoryGateway::new();

        let mut tx = gateway.begin().await.unwrap();
        let created = tx
            .insert_tournament(&NewTournament::single_elimination("kept", 4, 1))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = gateway.begin().await.unwrap();
        assert_eq!(tx.tournament(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_conflicting_inserts_are_ignored() {
        let gateway = MemoryGateway::new();
        let mut tx = gateway.begin().await.unwrap();

        assert!(tx.insert_participant(1, 10, "a").await.unwrap());
        assert!(!tx.insert_participant(1, 10, "again").await.unwrap());

        let key = MatchKey::new(1, 2, 0);
        assert!(tx.insert_match(&Match::empty(key)).await.unwrap());
        assert!(
            !tx.insert_match(&Match::empty(key).with_slot(Side::P1, 10))
                .await
                .unwrap()
        );
        assert_eq!(tx.find_match(key).await.unwrap(), Some(Match::empty(key)));

        assert!(tx.insert_queue_entry(5, GameMode::Classic).await.unwrap());
        assert!(!tx.insert_queue_entry(5, GameMode::Classic).await.unwrap());
    }

    #[tokio::test]
    async fn test_winner_is_write_once() {
        let gateway = MemoryGateway::new();
        let mut tx = gateway.begin().await.unwrap();
        let key = MatchKey::new(1, 1, 0);
        tx.insert_match(&Match::seeded(key, 1, 2, 1)).await.unwrap();

        assert!(tx.set_match_winner(key, 1).await.unwrap());
        assert!(!tx.set_match_winner(key, 2).await.unwrap());
        assert_eq!(tx.find_match(key).await.unwrap().unwrap().winner_id, Some(1));
    }
}
