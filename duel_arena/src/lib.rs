//! # Duel Arena
//!
//! Competitive core of a two-player game server: single-elimination
//! tournament brackets and a first-come first-served 1v1 matchmaking queue,
//! both backed by PostgreSQL.
//!
//! Every operation runs as one database transaction, so concurrent callers
//! never observe a half-applied bracket advance or a user matched twice.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Bracket engine, result propagation and the bracket view
//! - [`matchmaking`]: FIFO queue pairing users into games
//! - [`db`]: Connection pool, migrations and the transactional gateway
//! - [`game`]: Game records shared by both
//!
//! ## Example
//!
//! ```
//! use duel_arena::config::EngineConfig;
//! use duel_arena::db::MemoryGateway;
//! use duel_arena::game::GameMode;
//! use duel_arena::matchmaking::{EnqueueOutcome, MatchmakingQueue};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let queue = MatchmakingQueue::new(Arc::new(MemoryGateway::new()), EngineConfig::default());
//!
//! assert_eq!(queue.enqueue(1, GameMode::Classic).await.unwrap(), EnqueueOutcome::Queued);
//! let outcome = queue.enqueue(2, GameMode::Classic).await.unwrap();
//! assert!(matches!(outcome, EnqueueOutcome::Matched { opponent_id: 1, .. }));
//! # });
//! ```

/// User ID type, shared with the account service
pub type UserId = i64;

/// Engine settings.
pub mod config;
pub use config::EngineConfig;

/// Persistence: pool, migrations and gateways.
pub mod db;
pub use db::{Database, DatabaseConfig, Gateway, MemoryGateway, PgGateway, StoreError};

/// Game records.
pub mod game;
pub use game::{Game, GameId, GameMode, GameStatus};

/// Ad-hoc 1v1 matchmaking.
pub mod matchmaking;
pub use matchmaking::{EnqueueOutcome, MatchmakingQueue, QueueError, QueueStatus};

/// Single-elimination tournaments.
pub mod tournament;
pub use tournament::{
    BracketView, GameCompletionListener, MatchResultPropagator, TournamentError,
    TournamentManager,
};
