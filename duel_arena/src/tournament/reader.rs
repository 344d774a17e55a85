//! Read-only bracket view.

use std::collections::HashMap;

use super::bracket;
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    BracketMatch, BracketSeat, BracketView, Match, Participant, Slot, Tournament, TournamentId,
};
use crate::UserId;
use crate::db::StoreTx;

pub(crate) async fn read_bracket(
    tx: &mut dyn StoreTx,
    tournament_id: TournamentId,
) -> TournamentResult<BracketView> {
    let tournament = tx
        .tournament(tournament_id)
        .await?
        .ok_or(TournamentError::NotFound(tournament_id))?;
    let participants = tx.participants(tournament_id).await?;
    let matches = tx.bracket_matches(tournament_id).await?;

    Ok(build_view(&tournament, &participants, matches))
}

/// Annotate matches with nicknames and order them by round, then index
pub fn build_view(
    tournament: &Tournament,
    participants: &[Participant],
    mut matches: Vec<Match>,
) -> BracketView {
    let nicknames: HashMap<UserId, &str> = participants
        .iter()
        .map(|p| (p.user_id, p.nickname.as_str()))
        .collect();

    let seat = |slot: Slot| {
        slot.user().map(|user_id| BracketSeat {
            user_id,
            nickname: nicknames.get(&user_id).map(|n| n.to_string()),
        })
    };

    matches.sort_by_key(|m| m.key);

    BracketView {
        tournament_id: tournament.id,
        status: tournament.status,
        rounds: bracket::round_count(tournament.size),
        matches: matches
            .into_iter()
            .map(|m| BracketMatch {
                round: m.key.round,
                index: m.key.index,
                game_id: m.game_id,
                player1: seat(m.player1),
                player2: seat(m.player2),
                winner_id: m.winner_id,
            })
            .collect(),
    }
}
