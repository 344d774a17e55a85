//! Persistence gateway traits.
//!
//! Every engine operation opens one [`StoreTx`], performs its checks and writes
//! through it, and commits. Dropping a transaction without committing rolls it
//! back. Implementations must make the locking methods exclusive for the rest
//! of the transaction so check-then-write sequences cannot interleave.

use async_trait::async_trait;

use super::errors::StoreResult;
use crate::UserId;
use crate::game::{Game, GameId, GameMode, GameStatus};
use crate::matchmaking::QueueEntry;
use crate::tournament::{
    Match, MatchKey, NewTournament, Participant, Side, Tournament, TournamentId, TournamentStatus,
};

/// Source of transactions
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Begin a read-write transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Begin a transaction that only reads, seeing one consistent snapshot
    async fn snapshot(&self) -> StoreResult<Box<dyn StoreTx>> {
        self.begin().await
    }
}

/// One open transaction
#[async_trait]
pub trait StoreTx: Send {
    /// Insert a tournament in the pending state
    async fn insert_tournament(&mut self, new: &NewTournament) -> StoreResult<Tournament>;

    /// Read a tournament without locking it
    async fn tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Read a tournament and hold an exclusive lock on it until the transaction ends
    async fn lock_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// List tournaments, newest first
    async fn list_tournaments(
        &mut self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>>;

    /// Set the status, stamping started/finished times on the way
    async fn set_tournament_status(
        &mut self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> StoreResult<()>;

    /// Add a participant. Returns `false` if the pair already exists.
    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
        nickname: &str,
    ) -> StoreResult<bool>;

    /// Remove a participant. Returns `false` if there was none.
    async fn remove_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<bool>;

    /// Participants in join order
    async fn participants(&mut self, tournament_id: TournamentId)
    -> StoreResult<Vec<Participant>>;

    /// Insert a match. Returns `false` if the key is already taken.
    async fn insert_match(&mut self, m: &Match) -> StoreResult<bool>;

    async fn find_match(&mut self, key: MatchKey) -> StoreResult<Option<Match>>;

    async fn find_match_by_game(&mut self, game_id: GameId) -> StoreResult<Option<Match>>;

    /// Matches of one round in index order
    async fn round_matches(
        &mut self,
        tournament_id: TournamentId,
        round: u32,
    ) -> StoreResult<Vec<Match>>;

    /// All matches ordered by round, then index
    async fn bracket_matches(&mut self, tournament_id: TournamentId) -> StoreResult<Vec<Match>>;

    /// Fill one player slot, leaving the other side alone
    async fn fill_slot(&mut self, key: MatchKey, side: Side, user_id: UserId) -> StoreResult<()>;

    /// Set the winner if none is set yet. Returns `false` if a winner already existed.
    async fn set_match_winner(&mut self, key: MatchKey, winner_id: UserId) -> StoreResult<bool>;

    async fn link_game(&mut self, key: MatchKey, game_id: GameId) -> StoreResult<()>;

    async fn create_game(
        &mut self,
        player1_id: UserId,
        player2_id: UserId,
        status: GameStatus,
    ) -> StoreResult<Game>;

    /// Most recent game with the user in either seat that is not completed
    async fn active_game_for(&mut self, user_id: UserId) -> StoreResult<Option<Game>>;

    /// Hold the matchmaking queue exclusively until the transaction ends
    async fn lock_queue(&mut self) -> StoreResult<()>;

    async fn queue_entry(&mut self, user_id: UserId) -> StoreResult<Option<QueueEntry>>;

    /// Earliest-queued entry belonging to someone other than `user_id`
    async fn oldest_waiting_except(&mut self, user_id: UserId)
    -> StoreResult<Option<QueueEntry>>;

    /// Add a queue entry. Returns `false` if the user was already queued.
    async fn insert_queue_entry(&mut self, user_id: UserId, mode: GameMode) -> StoreResult<bool>;

    /// Remove a queue entry. Returns `false` if there was none.
    async fn remove_queue_entry(&mut self, user_id: UserId) -> StoreResult<bool>;

    /// Make every write of this transaction visible
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
