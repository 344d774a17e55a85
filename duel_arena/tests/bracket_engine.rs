//! Integration tests for the bracket engine.
//!
//! Run against the in-memory gateway so the full lifecycle (roster, seeding,
//! reporting, propagation and completion) is exercised without a database.

use duel_arena::config::EngineConfig;
use duel_arena::db::MemoryGateway;
use duel_arena::game::GameStatus;
use duel_arena::tournament::{
    GameCompletion, GameCompletionListener, MatchResultPropagator, NewTournament, RecordOutcome,
    Tournament, TournamentError, TournamentManager, TournamentStatus,
};
use std::sync::Arc;

const OWNER: i64 = 100;

fn setup() -> (TournamentManager, MatchResultPropagator, MemoryGateway) {
    let gateway = MemoryGateway::new();
    let shared = Arc::new(gateway.clone());
    let config = EngineConfig::default();
    (
        TournamentManager::new(shared.clone(), config.clone()),
        MatchResultPropagator::new(shared, config),
        gateway,
    )
}

/// Create a tournament of `size` and join users `1..=players` in order
async fn tournament_with(manager: &TournamentManager, size: u32, players: i64) -> Tournament {
    let tournament = manager
        .create_tournament(NewTournament::single_elimination("Test Cup", size, OWNER))
        .await
        .unwrap();
    for user_id in 1..=players {
        manager
            .join_tournament(tournament.id, user_id, &format!("player{user_id}"))
            .await
            .unwrap();
    }
    tournament
}

async fn started(manager: &TournamentManager, size: u32) -> Tournament {
    let tournament = tournament_with(manager, size, size as i64).await;
    manager.start_tournament(tournament.id, OWNER).await.unwrap();
    tournament
}

#[tokio::test]
async fn test_four_player_lifecycle() {
    let (manager, _, gateway) = setup();
    let cup = tournament_with(&manager, 4, 4).await;

    let summary = manager.start_tournament(cup.id, OWNER).await.unwrap();
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.matches_created, 2);
    assert_eq!(
        manager.get_tournament(cup.id).await.unwrap().status,
        TournamentStatus::Ongoing
    );

    // Seeded by join order
    let view = manager.get_bracket(cup.id).await.unwrap();
    assert_eq!(view.rounds, 2);
    assert_eq!(view.matches.len(), 2);
    let first = &view.matches[0];
    assert_eq!(first.player1.as_ref().unwrap().user_id, 1);
    assert_eq!(first.player2.as_ref().unwrap().user_id, 2);
    assert_eq!(
        first.player1.as_ref().unwrap().nickname.as_deref(),
        Some("player1")
    );
    let second = &view.matches[1];
    assert_eq!(second.player1.as_ref().unwrap().user_id, 3);
    assert_eq!(second.player2.as_ref().unwrap().user_id, 4);

    // Both opening games exist and are pending
    for m in &view.matches {
        let game = gateway.game(m.game_id.unwrap()).await.unwrap();
        assert_eq!(game.status, GameStatus::Pending);
    }

    assert_eq!(
        manager.record_match_result(cup.id, 1, 0, 1).await.unwrap(),
        RecordOutcome::AdvancedToNext
    );

    // Final exists with only p1 known and no game yet
    let view = manager.get_bracket(cup.id).await.unwrap();
    let final_match = view.round(2).next().unwrap();
    assert_eq!(final_match.player1.as_ref().unwrap().user_id, 1);
    assert!(final_match.player2.is_none());
    assert!(final_match.game_id.is_none());

    assert_eq!(
        manager.record_match_result(cup.id, 1, 1, 4).await.unwrap(),
        RecordOutcome::AdvancedToNext
    );

    let view = manager.get_bracket(cup.id).await.unwrap();
    let final_match = view.round(2).next().unwrap();
    assert_eq!(final_match.player2.as_ref().unwrap().user_id, 4);
    let final_game = gateway.game(final_match.game_id.unwrap()).await.unwrap();
    assert_eq!((final_game.player1_id, final_game.player2_id), (1, 4));
    assert_eq!(final_game.status, GameStatus::Pending);

    assert_eq!(
        manager.record_match_result(cup.id, 2, 0, 4).await.unwrap(),
        RecordOutcome::Completed
    );

    let tournament = manager.get_tournament(cup.id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);
    assert!(tournament.finished_at.is_some());

    let view = manager.get_bracket(cup.id).await.unwrap();
    assert_eq!(view.status, TournamentStatus::Completed);
    assert_eq!(view.matches.len(), 3);
    assert_eq!(view.champion(), Some(4));
}

#[tokio::test]
async fn test_two_player_final_completes_immediately() {
    let (manager, _, _) = setup();
    let duel = started(&manager, 2).await;

    assert_eq!(
        manager.record_match_result(duel.id, 1, 0, 2).await.unwrap(),
        RecordOutcome::Completed
    );

    let view = manager.get_bracket(duel.id).await.unwrap();
    assert_eq!(view.rounds, 1);
    assert_eq!(view.matches.len(), 1);
    assert_eq!(view.champion(), Some(2));
}

#[tokio::test]
async fn test_eight_player_propagation_shape() {
    let (manager, _, gateway) = setup();
    let cup = started(&manager, 8).await;

    // Only one semifinal feeder decided: the semifinal exists with p1 only
    manager.record_match_result(cup.id, 1, 0, 1).await.unwrap();
    let view = manager.get_bracket(cup.id).await.unwrap();
    assert_eq!(view.round(2).count(), 1);

    // Index 3 feeds p2 of semifinal 1
    manager.record_match_result(cup.id, 1, 3, 8).await.unwrap();
    let view = manager.get_bracket(cup.id).await.unwrap();
    let semis: Vec<_> = view.round(2).collect();
    assert_eq!(semis.len(), 2);
    assert_eq!(semis[0].player1.as_ref().unwrap().user_id, 1);
    assert!(semis[0].player2.is_none());
    assert!(semis[1].player1.is_none());
    assert_eq!(semis[1].player2.as_ref().unwrap().user_id, 8);

    manager.record_match_result(cup.id, 1, 1, 3).await.unwrap();
    manager.record_match_result(cup.id, 1, 2, 6).await.unwrap();

    let view = manager.get_bracket(cup.id).await.unwrap();
    for semi in view.round(2) {
        assert!(semi.game_id.is_some());
    }

    manager.record_match_result(cup.id, 2, 0, 3).await.unwrap();
    manager.record_match_result(cup.id, 2, 1, 6).await.unwrap();
    assert_eq!(
        manager.record_match_result(cup.id, 3, 0, 6).await.unwrap(),
        RecordOutcome::Completed
    );

    // 4 + 2 + 1 bracket games, each created once
    assert_eq!(gateway.games().await.len(), 7);
    assert_eq!(manager.get_bracket(cup.id).await.unwrap().champion(), Some(6));
}

#[tokio::test]
async fn test_start_error_codes() {
    let (manager, _, _) = setup();

    let missing = manager.start_tournament(9999, OWNER).await.unwrap_err();
    assert_eq!(missing.code(), "NOT_FOUND");

    let cup = tournament_with(&manager, 4, 4).await;
    let err = manager.start_tournament(cup.id, 1).await.unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let odd = tournament_with(&manager, 6, 6).await;
    let err = manager.start_tournament(odd.id, OWNER).await.unwrap_err();
    assert!(matches!(err, TournamentError::SizeNotPowerOfTwo(6)));

    let short = tournament_with(&manager, 4, 3).await;
    let err = manager.start_tournament(short.id, OWNER).await.unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InsufficientParticipants {
            needed: 4,
            current: 3
        }
    ));

    manager.start_tournament(cup.id, OWNER).await.unwrap();
    let err = manager.start_tournament(cup.id, OWNER).await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_STARTED");
}

#[tokio::test]
async fn test_failed_start_leaves_no_trace() {
    let (manager, _, gateway) = setup();
    let short = tournament_with(&manager, 4, 3).await;

    manager.start_tournament(short.id, OWNER).await.unwrap_err();

    assert_eq!(
        manager.get_tournament(short.id).await.unwrap().status,
        TournamentStatus::Pending
    );
    assert!(manager.get_bracket(short.id).await.unwrap().matches.is_empty());
    assert!(gateway.games().await.is_empty());
}

#[tokio::test]
async fn test_record_error_codes() {
    let (manager, _, _) = setup();

    let err = manager.record_match_result(9999, 1, 0, 1).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let pending = tournament_with(&manager, 4, 4).await;
    let err = manager
        .record_match_result(pending.id, 1, 0, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::NotOngoing(TournamentStatus::Pending)));

    let cup = started(&manager, 4).await;
    let err = manager.record_match_result(cup.id, 1, 5, 1).await.unwrap_err();
    assert_eq!(err.code(), "MATCH_NOT_FOUND");

    // Final does not exist until a semifinal is decided
    let err = manager.record_match_result(cup.id, 2, 0, 1).await.unwrap_err();
    assert_eq!(err.code(), "MATCH_NOT_FOUND");

    let err = manager.record_match_result(cup.id, 1, 0, 3).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_WINNER");

    manager.record_match_result(cup.id, 1, 0, 1).await.unwrap();
    let err = manager.record_match_result(cup.id, 1, 0, 2).await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_REPORTED");
    let err = manager.record_match_result(cup.id, 1, 0, 1).await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_REPORTED");

    assert!(!err.is_server_error());
}

#[tokio::test]
async fn test_out_of_bracket_keys_are_not_found() {
    let (manager, _, gateway) = setup();
    let cup = started(&manager, 4).await;
    let before = manager.get_bracket(cup.id).await.unwrap();

    for (round, index) in [(0, 0), (3, 0), (1, 2), (1, u32::MAX), (u32::MAX, 0)] {
        let err = manager
            .record_match_result(cup.id, round, index, 1)
            .await
            .unwrap_err();
        assert!(
            matches!(err, TournamentError::MatchNotFound(key) if key.round == round && key.index == index),
            "round {round} index {index}: {err:?}"
        );
        assert_eq!(err.code(), "MATCH_NOT_FOUND");
    }

    assert_eq!(manager.get_bracket(cup.id).await.unwrap(), before);
    assert_eq!(gateway.games().await.len(), 2);
}

#[tokio::test]
async fn test_invalid_winner_changes_nothing() {
    let (manager, _, gateway) = setup();
    let cup = started(&manager, 4).await;
    let before = manager.get_bracket(cup.id).await.unwrap();
    let games_before = gateway.games().await.len();

    manager
        .record_match_result(cup.id, 1, 0, 42)
        .await
        .unwrap_err();

    assert_eq!(manager.get_bracket(cup.id).await.unwrap(), before);
    assert_eq!(gateway.games().await.len(), games_before);
}

#[tokio::test]
async fn test_completed_tournament_rejects_reports() {
    let (manager, _, _) = setup();
    let duel = started(&manager, 2).await;
    manager.record_match_result(duel.id, 1, 0, 1).await.unwrap();

    let err = manager.record_match_result(duel.id, 1, 0, 2).await.unwrap_err();
    assert!(matches!(
        err,
        TournamentError::NotOngoing(TournamentStatus::Completed)
    ));
    assert_eq!(manager.get_bracket(duel.id).await.unwrap().matches.len(), 1);
}

#[tokio::test]
async fn test_owner_checked_reporting() {
    let (manager, _, _) = setup();
    let cup = started(&manager, 4).await;

    let err = manager
        .record_match_result_as(1, cup.id, 1, 0, 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    assert_eq!(
        manager
            .record_match_result_as(OWNER, cup.id, 1, 0, 1)
            .await
            .unwrap(),
        RecordOutcome::AdvancedToNext
    );
}

#[tokio::test]
async fn test_roster_rules() {
    let (manager, _, _) = setup();

    let err = manager
        .create_tournament(NewTournament::single_elimination("  ", 4, OWNER))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_NAME");

    let err = manager
        .create_tournament(NewTournament::single_elimination("Huge", 128, OWNER))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_SIZE");

    let cup = tournament_with(&manager, 2, 2).await;

    let err = manager.join_tournament(cup.id, 1, "again").await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_JOINED");

    let err = manager.join_tournament(cup.id, 3, "late").await.unwrap_err();
    assert_eq!(err.code(), "TOURNAMENT_FULL");

    manager.leave_tournament(cup.id, 2).await.unwrap();
    let err = manager.leave_tournament(cup.id, 2).await.unwrap_err();
    assert_eq!(err.code(), "NOT_PARTICIPANT");

    manager.join_tournament(cup.id, 3, "late").await.unwrap();
    let roster: Vec<i64> = manager
        .participants(cup.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.user_id)
        .collect();
    assert_eq!(roster, vec![1, 3]);

    manager.start_tournament(cup.id, OWNER).await.unwrap();
    let err = manager.join_tournament(cup.id, 4, "after").await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_STARTED");
    let err = manager.leave_tournament(cup.id, 1).await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_STARTED");
}

#[tokio::test]
async fn test_list_tournaments_by_status() {
    let (manager, _, _) = setup();
    let pending = tournament_with(&manager, 4, 0).await;
    let ongoing = started(&manager, 2).await;

    let all = manager.list_tournaments(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let only_pending = manager
        .list_tournaments(Some(TournamentStatus::Pending))
        .await
        .unwrap();
    assert_eq!(only_pending.len(), 1);
    assert_eq!(only_pending[0].id, pending.id);

    let only_ongoing = manager
        .list_tournaments(Some(TournamentStatus::Ongoing))
        .await
        .unwrap();
    assert_eq!(only_ongoing[0].id, ongoing.id);
}

#[tokio::test]
async fn test_game_completion_drives_bracket() {
    let (manager, propagator, gateway) = setup();
    let cup = started(&manager, 4).await;
    let view = manager.get_bracket(cup.id).await.unwrap();
    let semi_games: Vec<i64> = view.matches.iter().map(|m| m.game_id.unwrap()).collect();

    gateway.complete_game(semi_games[0], 2).await.unwrap();
    assert_eq!(
        propagator.on_game_completed(semi_games[0], 2).await.unwrap(),
        GameCompletion::Recorded(RecordOutcome::AdvancedToNext)
    );

    // Redelivery is a no-op
    assert_eq!(
        propagator.on_game_completed(semi_games[0], 2).await.unwrap(),
        GameCompletion::AlreadyRecorded
    );

    // A conflicting redelivery is rejected and leaves the winner alone
    let err = propagator
        .on_game_completed(semi_games[0], 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_REPORTED");

    gateway.complete_game(semi_games[1], 3).await.unwrap();
    propagator.on_game_completed(semi_games[1], 3).await.unwrap();

    let view = manager.get_bracket(cup.id).await.unwrap();
    let final_match = view.round(2).next().unwrap();
    assert_eq!(final_match.player1.as_ref().unwrap().user_id, 2);
    assert_eq!(final_match.player2.as_ref().unwrap().user_id, 3);

    let final_game = final_match.game_id.unwrap();
    assert_eq!(
        propagator.on_game_completed(final_game, 3).await.unwrap(),
        GameCompletion::Recorded(RecordOutcome::Completed)
    );
    assert_eq!(
        propagator.on_game_completed(final_game, 2).await.unwrap(),
        GameCompletion::TournamentClosed
    );
    assert_eq!(manager.get_bracket(cup.id).await.unwrap().champion(), Some(3));
}

#[tokio::test]
async fn test_game_completion_ignores_unlinked_games() {
    let (_, propagator, _) = setup();
    assert_eq!(
        propagator.on_game_completed(12345, 1).await.unwrap(),
        GameCompletion::NotTournamentGame
    );
}

#[tokio::test]
async fn test_game_completion_validates_winner() {
    let (manager, propagator, _) = setup();
    let cup = started(&manager, 4).await;
    let game_id = manager.get_bracket(cup.id).await.unwrap().matches[0]
        .game_id
        .unwrap();

    let err = propagator.on_game_completed(game_id, 4).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_WINNER");
    assert!(manager.get_bracket(cup.id).await.unwrap().matches[0]
        .winner_id
        .is_none());
}

#[tokio::test]
async fn test_manual_and_event_paths_agree() {
    let (manager, propagator, _) = setup();
    let cup = started(&manager, 4).await;
    let game_id = manager.get_bracket(cup.id).await.unwrap().matches[1]
        .game_id
        .unwrap();

    manager.record_match_result(cup.id, 1, 1, 4).await.unwrap();
    assert_eq!(
        propagator.on_game_completed(game_id, 4).await.unwrap(),
        GameCompletion::AlreadyRecorded
    );
}

#[tokio::test]
async fn test_concurrent_reports_for_sibling_matches() {
    let (manager, _, gateway) = setup();
    let id = started(&manager, 4).await.id;

    let left = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.record_match_result(id, 1, 0, 1).await })
    };
    let right = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.record_match_result(id, 1, 1, 3).await })
    };
    left.await.unwrap().unwrap();
    right.await.unwrap().unwrap();

    let view = manager.get_bracket(id).await.unwrap();
    let finals: Vec<_> = view.round(2).collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].player1.as_ref().unwrap().user_id, 1);
    assert_eq!(finals[0].player2.as_ref().unwrap().user_id, 3);

    // Exactly one final game
    assert_eq!(gateway.games().await.len(), 3);
}

#[tokio::test]
async fn test_concurrent_reports_for_same_match() {
    let (manager, _, _) = setup();
    let id = started(&manager, 4).await.id;

    let handles: Vec<_> = [1, 2]
        .into_iter()
        .map(|winner| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.record_match_result(id, 1, 0, winner).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert_eq!(err.code(), "ALREADY_REPORTED"),
        }
    }
    assert_eq!(accepted, 1);
}

#[tokio::test]
async fn test_concurrent_starts() {
    let (manager, _, gateway) = setup();
    let id = tournament_with(&manager, 4, 4).await.id;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.start_tournament(id, OWNER).await })
        })
        .collect();

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(err) => assert_eq!(err.code(), "ALREADY_STARTED"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(gateway.games().await.len(), 2);
}
