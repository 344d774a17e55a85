//! Operator CLI for duel arena.
//!
//! Each invocation runs one engine operation against the configured database
//! and prints the result as JSON on stdout.

mod config;
mod logging;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Error;
use duel_arena::{
    GameId, GameMode, UserId,
    db::{Database, Gateway, StoreError},
    matchmaking::{MatchmakingQueue, QueueError},
    tournament::{
        GameCompletionListener, MatchResultPropagator, NewTournament, TournamentError,
        TournamentId, TournamentManager, TournamentStatus,
    },
};
use pico_args::Arguments;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::config::AdminConfig;

const HELP: &str = "\
Administer duel arena tournaments and the matchmaking queue

USAGE:
  da_admin [OPTIONS] <COMMAND> [ARGS]

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

COMMANDS:
  migrate                                              Apply schema migrations
  create          --name NAME --size N --owner ID      Create a pending tournament
  join            --tournament ID --user ID --nickname NAME
  leave           --tournament ID --user ID
  start           --tournament ID --caller ID          Seed round 1
  report          --tournament ID --round R --index I --winner ID [--caller ID]
  game-completed  --game ID --winner ID                Deliver a game-finished event
  bracket         --tournament ID                      Print the bracket
  list            [--status pending|ongoing|completed]
  enqueue         --user ID [--mode classic]
  dequeue         --user ID
  status          --user ID

EXIT STATUS:
  0  success
  1  server error (database unreachable, timeout, ...)
  2  rejected request or bad usage; the error code is printed as JSON

ENVIRONMENT:
  DATABASE_URL                     PostgreSQL connection string
  ARENA_TRANSACTION_TIMEOUT_SECS   Per-operation deadline [default: 10]
  ARENA_MAX_TOURNAMENT_SIZE        Largest accepted bracket [default: 64]
  RUST_LOG                         Log filter [default: info,sqlx=warn]
";

enum Command {
    Migrate,
    Create {
        name: String,
        size: u32,
        owner: UserId,
    },
    Join {
        tournament: TournamentId,
        user: UserId,
        nickname: String,
    },
    Leave {
        tournament: TournamentId,
        user: UserId,
    },
    Start {
        tournament: TournamentId,
        caller: UserId,
    },
    Report {
        tournament: TournamentId,
        round: u32,
        index: u32,
        winner: UserId,
        caller: Option<UserId>,
    },
    GameCompleted {
        game: GameId,
        winner: UserId,
    },
    Bracket {
        tournament: TournamentId,
    },
    List {
        status: Option<TournamentStatus>,
    },
    Enqueue {
        user: UserId,
        mode: GameMode,
    },
    Dequeue {
        user: UserId,
    },
    Status {
        user: UserId,
    },
}

impl Command {
    fn parse(mut pargs: Arguments) -> Result<Self, pico_args::Error> {
        let Some(name) = pargs.subcommand()? else {
            return Err(pico_args::Error::MissingArgument);
        };

        let command = match name.as_str() {
            "migrate" => Command::Migrate,
            "create" => Command::Create {
                name: pargs.value_from_str("--name")?,
                size: pargs.value_from_str("--size")?,
                owner: pargs.value_from_str("--owner")?,
            },
            "join" => Command::Join {
                tournament: pargs.value_from_str("--tournament")?,
                user: pargs.value_from_str("--user")?,
                nickname: pargs.value_from_str("--nickname")?,
            },
            "leave" => Command::Leave {
                tournament: pargs.value_from_str("--tournament")?,
                user: pargs.value_from_str("--user")?,
            },
            "start" => Command::Start {
                tournament: pargs.value_from_str("--tournament")?,
                caller: pargs.value_from_str("--caller")?,
            },
            "report" => Command::Report {
                tournament: pargs.value_from_str("--tournament")?,
                round: pargs.value_from_str("--round")?,
                index: pargs.value_from_str("--index")?,
                winner: pargs.value_from_str("--winner")?,
                caller: pargs.opt_value_from_str("--caller")?,
            },
            "game-completed" => Command::GameCompleted {
                game: pargs.value_from_str("--game")?,
                winner: pargs.value_from_str("--winner")?,
            },
            "bracket" => Command::Bracket {
                tournament: pargs.value_from_str("--tournament")?,
            },
            "list" => Command::List {
                status: pargs.opt_value_from_fn("--status", parse_status)?,
            },
            "enqueue" => Command::Enqueue {
                user: pargs.value_from_str("--user")?,
                mode: pargs
                    .opt_value_from_fn("--mode", parse_mode)?
                    .unwrap_or_default(),
            },
            "dequeue" => Command::Dequeue {
                user: pargs.value_from_str("--user")?,
            },
            "status" => Command::Status {
                user: pargs.value_from_str("--user")?,
            },
            other => {
                return Err(pico_args::Error::ArgumentParsingFailed {
                    cause: format!("unknown command '{other}'"),
                });
            }
        };

        if let Some(extra) = pargs.finish().first() {
            return Err(pico_args::Error::ArgumentParsingFailed {
                cause: format!("unexpected argument {extra:?}"),
            });
        }

        Ok(command)
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Migrate => "migrate",
            Command::Create { .. } => "create",
            Command::Join { .. } => "join",
            Command::Leave { .. } => "leave",
            Command::Start { .. } => "start",
            Command::Report { .. } => "report",
            Command::GameCompleted { .. } => "game-completed",
            Command::Bracket { .. } => "bracket",
            Command::List { .. } => "list",
            Command::Enqueue { .. } => "enqueue",
            Command::Dequeue { .. } => "dequeue",
            Command::Status { .. } => "status",
        }
    }
}

fn parse_status(value: &str) -> Result<TournamentStatus, String> {
    TournamentStatus::parse(value).ok_or_else(|| format!("unknown status '{value}'"))
}

fn parse_mode(value: &str) -> Result<GameMode, String> {
    GameMode::parse(value).ok_or_else(|| format!("unknown mode '{value}'"))
}

/// Failure of one command
#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Tournament(#[from] TournamentError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CommandError {
    fn code(&self) -> &'static str {
        match self {
            CommandError::Tournament(e) => e.code(),
            CommandError::Queue(e) => e.code(),
            CommandError::Store(_) | CommandError::Output(_) => "SERVER_ERROR",
        }
    }

    fn is_server_error(&self) -> bool {
        match self {
            CommandError::Tournament(e) => e.is_server_error(),
            CommandError::Queue(e) => e.is_server_error(),
            CommandError::Store(_) | CommandError::Output(_) => true,
        }
    }

    fn client_message(&self) -> String {
        match self {
            CommandError::Tournament(e) => e.client_message(),
            CommandError::Queue(e) => e.client_message(),
            CommandError::Store(_) | CommandError::Output(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

async fn run(command: Command, db: &Database, config: &AdminConfig) -> Result<Value, CommandError> {
    let gateway: Arc<dyn Gateway> = Arc::new(db.gateway());
    let engine = config.engine.clone();
    let tournaments = TournamentManager::new(gateway.clone(), engine.clone());

    let output = match command {
        Command::Migrate => {
            db.migrate().await?;
            json!({ "migrated": true })
        }
        Command::Create { name, size, owner } => {
            let tournament = tournaments
                .create_tournament(NewTournament::single_elimination(name, size, owner))
                .await?;
            serde_json::to_value(tournament)?
        }
        Command::Join {
            tournament,
            user,
            nickname,
        } => {
            tournaments
                .join_tournament(tournament, user, &nickname)
                .await?;
            json!({ "tournament_id": tournament, "user_id": user, "joined": true })
        }
        Command::Leave { tournament, user } => {
            tournaments.leave_tournament(tournament, user).await?;
            json!({ "tournament_id": tournament, "user_id": user, "left": true })
        }
        Command::Start { tournament, caller } => {
            serde_json::to_value(tournaments.start_tournament(tournament, caller).await?)?
        }
        Command::Report {
            tournament,
            round,
            index,
            winner,
            caller,
        } => {
            let outcome = match caller {
                Some(caller) => {
                    tournaments
                        .record_match_result_as(caller, tournament, round, index, winner)
                        .await?
                }
                None => {
                    tournaments
                        .record_match_result(tournament, round, index, winner)
                        .await?
                }
            };
            json!({ "outcome": outcome })
        }
        Command::GameCompleted { game, winner } => {
            let propagator = MatchResultPropagator::new(gateway, engine);
            let result = propagator.on_game_completed(game, winner).await?;
            json!({ "game_id": game, "result": result })
        }
        Command::Bracket { tournament } => {
            serde_json::to_value(tournaments.get_bracket(tournament).await?)?
        }
        Command::List { status } => {
            serde_json::to_value(tournaments.list_tournaments(status).await?)?
        }
        Command::Enqueue { user, mode } => {
            let queue = MatchmakingQueue::new(gateway, engine);
            serde_json::to_value(queue.enqueue(user, mode).await?)?
        }
        Command::Dequeue { user } => {
            let queue = MatchmakingQueue::new(gateway, engine);
            let removed = queue.dequeue(user).await?;
            json!({ "user_id": user, "removed": removed })
        }
        Command::Status { user } => {
            let queue = MatchmakingQueue::new(gateway, engine);
            serde_json::to_value(queue.status(user).await?)?
        }
    };

    Ok(output)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let command = match Command::parse(pargs) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    logging::init();

    let config = AdminConfig::from_env(database_url);
    config.validate()?;

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    db.health_check()
        .await
        .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;
    info!("Database connected successfully");

    let operation = command.name();
    let started = Instant::now();
    let result = run(command, &db, &config).await;
    db.close().await;

    match result {
        Ok(output) => {
            logging::log_operation(operation, "OK", started.elapsed());
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            logging::log_operation(operation, err.code(), started.elapsed());
            if err.is_server_error() {
                error!("{operation} failed: {err}");
            }
            let body = json!({ "error": err.code(), "message": err.client_message() });
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(if err.is_server_error() { 1 } else { 2 });
        }
    }
}
