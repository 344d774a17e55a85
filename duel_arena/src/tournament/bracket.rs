//! Bracket arithmetic: round counts, seeding pairs and where winners go.
//!
//! Everything here is pure and works on keys and rosters only; the
//! transactional side lives in [`super::progress`].

use super::models::{MatchKey, Participant, Side};
use crate::UserId;

/// Number of rounds for a bracket of `size` players, when `size` is a power of two ≥ 2
pub fn rounds_for(size: u32) -> Option<u32> {
    if size >= 2 && size.is_power_of_two() {
        Some(size.trailing_zeros())
    } else {
        None
    }
}

/// Round count used for display, `floor(log2(size))`
pub fn round_count(size: u32) -> u32 {
    if size < 2 { 0 } else { size.ilog2() }
}

/// Number of matches in `round` of a bracket of `size`
pub fn matches_in_round(size: u32, round: u32) -> u32 {
    if round == 0 || round > 31 {
        return 0;
    }
    size >> round
}

/// Whether `key` addresses a match that can exist in a bracket of `size`
pub fn is_valid_key(size: u32, key: &MatchKey) -> bool {
    match rounds_for(size) {
        Some(rounds) => {
            (1..=rounds).contains(&key.round) && key.index < matches_in_round(size, key.round)
        }
        None => false,
    }
}

/// Round-1 pairings in join order: (0,1), (2,3), ...
///
/// Returns `(match_index, player1, player2)`. A trailing unpaired participant is ignored.
pub fn seed_pairs(participants: &[Participant]) -> Vec<(u32, UserId, UserId)> {
    participants
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| (index as u32, pair[0].user_id, pair[1].user_id))
        .collect()
}

/// Where the winner of a match lands in the next round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextSlot {
    pub key: MatchKey,
    pub side: Side,
}

/// Even indices feed `p1` of `index / 2`, odd indices feed `p2`
pub fn next_slot(key: &MatchKey) -> NextSlot {
    NextSlot {
        key: MatchKey::new(key.tournament_id, key.round + 1, key.index / 2),
        side: if key.index % 2 == 0 { Side::P1 } else { Side::P2 },
    }
}
