//! Ad-hoc 1v1 matchmaking.
//!
//! Users wait in a strict FIFO queue; the next user to arrive is paired with
//! the one who has waited longest. A user with any unfinished game cannot
//! queue.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{QueueError, QueueResult};
pub use manager::MatchmakingQueue;
pub use models::{EnqueueOutcome, QueueEntry, QueueStatus};
