//! PostgreSQL implementation of the persistence gateway.
//!
//! Bracket operations serialize on the tournament row (`SELECT ... FOR UPDATE`);
//! the matchmaking queue serializes on a transaction-scoped advisory lock.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::errors::{StoreError, StoreResult};
use super::gateway::{Gateway, StoreTx};
use crate::UserId;
use crate::game::{Game, GameId, GameMode, GameStatus};
use crate::matchmaking::QueueEntry;
use crate::tournament::{
    Match, MatchKey, NewTournament, Participant, Side, Slot, Tournament, TournamentId,
    TournamentStatus, TournamentType,
};

/// Advisory lock key guarding the matchmaking queue
pub const MATCHMAKING_LOCK_KEY: i64 = 0x6d61_7463_686d_6b71;

const TOURNAMENT_COLUMNS: &str = "id, name, tournament_type, size, status, owner_id, created_at, started_at, finished_at";
const MATCH_COLUMNS: &str =
    "tournament_id, round, match_index, game_id, player1_id, player2_id, winner_id";
const GAME_COLUMNS: &str =
    "id, player1_id, player2_id, score1, score2, status, winner_id, created_at";

/// Gateway over a PostgreSQL pool
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn snapshot(&self) -> StoreResult<Box<dyn StoreTx>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Open PostgreSQL transaction
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn tournament_from_row(row: &PgRow) -> StoreResult<Tournament> {
    let type_str: String = row.try_get("tournament_type")?;
    let status_str: String = row.try_get("status")?;
    let size: i32 = row.try_get("size")?;

    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        tournament_type: TournamentType::parse(&type_str)
            .ok_or_else(|| StoreError::corrupt("tournament_type", &type_str))?,
        size: u32::try_from(size).map_err(|_| StoreError::corrupt("size", size))?,
        status: TournamentStatus::parse(&status_str)
            .ok_or_else(|| StoreError::corrupt("status", &status_str))?,
        owner_id: row.try_get("owner_id")?,
        created_at: row.try_get::<NaiveDateTime, _>("created_at")?.and_utc(),
        started_at: row
            .try_get::<Option<NaiveDateTime>, _>("started_at")?
            .map(|dt| dt.and_utc()),
        finished_at: row
            .try_get::<Option<NaiveDateTime>, _>("finished_at")?
            .map(|dt| dt.and_utc()),
    })
}

fn match_from_row(row: &PgRow) -> StoreResult<Match> {
    let round: i32 = row.try_get("round")?;
    let index: i32 = row.try_get("match_index")?;

    Ok(Match {
        key: MatchKey::new(
            row.try_get("tournament_id")?,
            u32::try_from(round).map_err(|_| StoreError::corrupt("round", round))?,
            u32::try_from(index).map_err(|_| StoreError::corrupt("match_index", index))?,
        ),
        game_id: row.try_get("game_id")?,
        player1: Slot::from(row.try_get::<Option<UserId>, _>("player1_id")?),
        player2: Slot::from(row.try_get::<Option<UserId>, _>("player2_id")?),
        winner_id: row.try_get("winner_id")?,
    })
}

fn game_from_row(row: &PgRow) -> StoreResult<Game> {
    let status_str: String = row.try_get("status")?;

    Ok(Game {
        id: row.try_get("id")?,
        player1_id: row.try_get("player1_id")?,
        player2_id: row.try_get("player2_id")?,
        score: (row.try_get("score1")?, row.try_get("score2")?),
        status: GameStatus::parse(&status_str)
            .ok_or_else(|| StoreError::corrupt("game status", &status_str))?,
        winner_id: row.try_get("winner_id")?,
        created_at: row.try_get::<NaiveDateTime, _>("created_at")?.and_utc(),
    })
}

fn queue_entry_from_row(row: &PgRow) -> StoreResult<QueueEntry> {
    let mode_str: String = row.try_get("mode")?;

    Ok(QueueEntry {
        user_id: row.try_get("user_id")?,
        mode: GameMode::parse(&mode_str).ok_or_else(|| StoreError::corrupt("mode", &mode_str))?,
        queued_at: row.try_get::<NaiveDateTime, _>("queued_at")?.and_utc(),
    })
}

/// Bind helper for the `u32` size/round/index columns stored as INTEGER
fn as_int(column: &'static str, value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::corrupt(column, value))
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_tournament(&mut self, new: &NewTournament) -> StoreResult<Tournament> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tournaments (name, tournament_type, size, status, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(new.tournament_type.as_str())
        .bind(as_int("size", new.size)?)
        .bind(TournamentStatus::Pending.as_str())
        .bind(new.owner_id)
        .fetch_one(&mut *self.tx)
        .await?;

        tournament_from_row(&row)
    }

    async fn tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &mut self,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    r#"
                    SELECT {TOURNAMENT_COLUMNS}
                    FROM tournaments
                    WHERE status = $1
                    ORDER BY created_at DESC, id DESC
                    "#
                ))
                .bind(status.as_str())
                .fetch_all(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    r#"
                    SELECT {TOURNAMENT_COLUMNS}
                    FROM tournaments
                    ORDER BY created_at DESC, id DESC
                    "#
                ))
                .fetch_all(&mut *self.tx)
                .await?
            }
        };

        rows.iter().map(tournament_from_row).collect()
    }

    async fn set_tournament_status(
        &mut self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tournaments
            SET status = $1,
                started_at = CASE WHEN $1::text = 'ongoing' THEN COALESCE(started_at, NOW()) ELSE started_at END,
                finished_at = CASE WHEN $1::text = 'completed' THEN COALESCE(finished_at, NOW()) ELSE finished_at END
            WHERE id = $2
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
        nickname: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO tournament_participants (tournament_id, user_id, nickname)
            VALUES ($1, $2, $3)
            ON CONFLICT (tournament_id, user_id) DO NOTHING
            "#,
        )
        .bind(tournament_id)
        .bind(user_id)
        .bind(nickname)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM tournament_participants WHERE tournament_id = $1 AND user_id = $2",
        )
        .bind(tournament_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn participants(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Participant>> {
        let rows = sqlx::query(
            r#"
            SELECT tournament_id, user_id, nickname, joined_at
            FROM tournament_participants
            WHERE tournament_id = $1
            ORDER BY joined_at, seq
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Participant {
                    tournament_id: row.try_get("tournament_id")?,
                    user_id: row.try_get("user_id")?,
                    nickname: row.try_get("nickname")?,
                    joined_at: row.try_get::<NaiveDateTime, _>("joined_at")?.and_utc(),
                })
            })
            .collect()
    }

    async fn insert_match(&mut self, m: &Match) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO tournament_matches
                (tournament_id, round, match_index, game_id, player1_id, player2_id, winner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tournament_id, round, match_index) DO NOTHING
            "#,
        )
        .bind(m.key.tournament_id)
        .bind(as_int("round", m.key.round)?)
        .bind(as_int("match_index", m.key.index)?)
        .bind(m.game_id)
        .bind(m.player1.user())
        .bind(m.player2.user())
        .bind(m.winner_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_match(&mut self, key: MatchKey) -> StoreResult<Option<Match>> {
        // No stored row can carry a key past INTEGER range
        let (Ok(round), Ok(index)) = (
            as_int("round", key.round),
            as_int("match_index", key.index),
        ) else {
            return Ok(None);
        };

        let row = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM tournament_matches
            WHERE tournament_id = $1 AND round = $2 AND match_index = $3
            "#
        ))
        .bind(key.tournament_id)
        .bind(round)
        .bind(index)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn find_match_by_game(&mut self, game_id: GameId) -> StoreResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM tournament_matches WHERE game_id = $1"
        ))
        .bind(game_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn round_matches(
        &mut self,
        tournament_id: TournamentId,
        round: u32,
    ) -> StoreResult<Vec<Match>> {
        let Ok(round) = as_int("round", round) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM tournament_matches
            WHERE tournament_id = $1 AND round = $2
            ORDER BY match_index
            "#
        ))
        .bind(tournament_id)
        .bind(round)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn bracket_matches(&mut self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM tournament_matches
            WHERE tournament_id = $1
            ORDER BY round, match_index
            "#
        ))
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn fill_slot(&mut self, key: MatchKey, side: Side, user_id: UserId) -> StoreResult<()> {
        let sql = match side {
            Side::P1 => {
                "UPDATE tournament_matches SET player1_id = $4
                 WHERE tournament_id = $1 AND round = $2 AND match_index = $3"
            }
            Side::P2 => {
                "UPDATE tournament_matches SET player2_id = $4
                 WHERE tournament_id = $1 AND round = $2 AND match_index = $3"
            }
        };

        sqlx::query(sql)
            .bind(key.tournament_id)
            .bind(as_int("round", key.round)?)
            .bind(as_int("match_index", key.index)?)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn set_match_winner(&mut self, key: MatchKey, winner_id: UserId) -> StoreResult<bool> {
        // The NULL guard makes the write-once check part of the write itself
        let result = sqlx::query(
            r#"
            UPDATE tournament_matches
            SET winner_id = $4
            WHERE tournament_id = $1 AND round = $2 AND match_index = $3
              AND winner_id IS NULL
            "#,
        )
        .bind(key.tournament_id)
        .bind(as_int("round", key.round)?)
        .bind(as_int("match_index", key.index)?)
        .bind(winner_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn link_game(&mut self, key: MatchKey, game_id: GameId) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tournament_matches
            SET game_id = $4
            WHERE tournament_id = $1 AND round = $2 AND match_index = $3
            "#,
        )
        .bind(key.tournament_id)
        .bind(as_int("round", key.round)?)
        .bind(as_int("match_index", key.index)?)
        .bind(game_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn create_game(
        &mut self,
        player1_id: UserId,
        player2_id: UserId,
        status: GameStatus,
    ) -> StoreResult<Game> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO games (player1_id, player2_id, status)
            VALUES ($1, $2, $3)
            RETURNING {GAME_COLUMNS}
            "#
        ))
        .bind(player1_id)
        .bind(player2_id)
        .bind(status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        game_from_row(&row)
    }

    async fn active_game_for(&mut self, user_id: UserId) -> StoreResult<Option<Game>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {GAME_COLUMNS}
            FROM games
            WHERE (player1_id = $1 OR player2_id = $1) AND status <> $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(GameStatus::Completed.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(game_from_row).transpose()
    }

    async fn lock_queue(&mut self) -> StoreResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MATCHMAKING_LOCK_KEY)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn queue_entry(&mut self, user_id: UserId) -> StoreResult<Option<QueueEntry>> {
        let row =
            sqlx::query("SELECT user_id, mode, queued_at FROM matchmaking_queue WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        row.as_ref().map(queue_entry_from_row).transpose()
    }

    async fn oldest_waiting_except(
        &mut self,
        user_id: UserId,
    ) -> StoreResult<Option<QueueEntry>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, mode, queued_at
            FROM matchmaking_queue
            WHERE user_id <> $1
            ORDER BY queued_at, seq
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(queue_entry_from_row).transpose()
    }

    async fn insert_queue_entry(&mut self, user_id: UserId, mode: GameMode) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO matchmaking_queue (user_id, mode)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(mode.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_queue_entry(&mut self, user_id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM matchmaking_queue WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
