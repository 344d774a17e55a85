//! Game records shared with the game lifecycle service.
//!
//! The bracket engine and the matchmaking queue create games; everything that
//! happens to a game afterwards (scoring, finishing) belongs to the lifecycle
//! service, which reports finished tournament games back through
//! [`crate::tournament::GameCompletionListener`].

pub mod models;

pub use models::{Game, GameId, GameMode, GameStatus};
