//! Single-elimination tournaments.
//!
//! This module provides:
//! - Tournament creation and roster management
//! - Seeding round 1 by join order
//! - Recording results and propagating winners round to round
//! - Completion detection when the final is decided
//! - A read-only bracket view
//!
//! ## Example
//!
//! ```no_run
//! use duel_arena::config::EngineConfig;
//! use duel_arena::db::Database;
//! use duel_arena::tournament::{NewTournament, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let manager = TournamentManager::new(Arc::new(db.gateway()), EngineConfig::default());
//!
//!     let cup = manager
//!         .create_tournament(NewTournament::single_elimination("Friday Cup", 4, 1))
//!         .await?;
//!     for (user_id, nickname) in [(1, "ann"), (2, "bob"), (3, "cat"), (4, "dan")] {
//!         manager.join_tournament(cup.id, user_id, nickname).await?;
//!     }
//!
//!     let summary = manager.start_tournament(cup.id, 1).await?;
//!     println!("{} rounds, {} opening matches", summary.rounds, summary.matches_created);
//!
//!     Ok(())
//! }
//! ```

pub mod bracket;
pub mod errors;
pub mod manager;
pub mod models;
mod progress;
pub mod propagator;
mod reader;

pub use errors::{TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    BracketMatch, BracketSeat, BracketView, GameCompletion, Match, MatchKey, NewTournament,
    Participant, RecordOutcome, Side, Slot, StartSummary, Tournament, TournamentId,
    TournamentStatus, TournamentType,
};
pub use progress::RoundProgress;
pub use propagator::{GameCompletionListener, MatchResultPropagator};
pub use reader::build_view;
