use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use globetrotter_core::model::SessionId;
use services::{
    AppServices, Clock, GameEngine, GameError, NextQuestion, PexelsImageLookup, SharedRng,
    ensure_seeded,
};
use storage::repository::Storage;
use storage::seed::SeedOutcome;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidDataPath { raw: String },
    MissingUser,
    MissingCommand,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDataPath { raw } => write!(f, "invalid --data value: {raw}"),
            ArgsError::MissingUser => write!(f, "play requires --user <handle>"),
            ArgsError::MissingCommand => write!(f, "missing subcommand (seed or play)"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed [--db <sqlite_url>] [--data <json_path>]");
    eprintln!(
        "  cargo run -p app -- play --user <handle> [--db <sqlite_url>] [--data <json_path>]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://globetrotter.sqlite3");
    eprintln!("  --data data/destinations.json");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GLOBE_DB_URL, GLOBE_DATA, PEXELS_API_KEY, GLOBE_IMAGE_QUERY, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Play,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "play" => Some(Self::Play),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    data_path: PathBuf,
    user: Option<String>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("GLOBE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://globetrotter.sqlite3".into(), normalize_sqlite_url);
        let mut data_path = std::env::var("GLOBE_DATA")
            .map_or_else(|_| PathBuf::from("data/destinations.json"), PathBuf::from);
        let mut user = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--data" => {
                    let value = require_value(args, "--data")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDataPath { raw: value });
                    }
                    data_path = PathBuf::from(value);
                }
                "--user" if cmd == Command::Play => {
                    user = Some(require_value(args, "--user")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Play && user.is_none() {
            return Err(ArgsError::MissingUser);
        }

        Ok(Self {
            db_url,
            data_path,
            user,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Game output owns stdout.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

type Input = Lines<BufReader<Stdin>>;

async fn read_choice(
    input: &mut Input,
    options: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    loop {
        print!("Your answer [1-{options}]: ");
        std::io::stdout().flush()?;
        let Some(line) = input.next_line().await? else {
            return Err("input closed before the session finished".into());
        };
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=options).contains(&n) => return Ok(n - 1),
            _ => eprintln!("Pick a number between 1 and {options}."),
        }
    }
}

fn print_question(next: &NextQuestion) {
    println!();
    println!(
        "Question {}/{}: {}",
        next.position, next.total_questions, next.clue
    );
    for (i, option) in next.options.iter().enumerate() {
        println!("  {}. {}", i + 1, option.label);
    }
}

async fn play(
    engine: &GameEngine,
    session_id: SessionId,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let next = match engine.next_question(session_id).await {
            Ok(next) => next,
            Err(GameError::NoQuestionsRemaining(_)) => break,
            Err(e) => return Err(e.into()),
        };
        print_question(&next);

        let choice = read_choice(&mut input, next.options.len()).await?;
        let answer = engine
            .submit_answer(session_id, next.question_id, next.options[choice].id)
            .await?;

        if answer.is_correct {
            println!("Correct! It was {}, {}.", answer.city, answer.country);
        } else {
            println!("Not quite. It was {}, {}.", answer.city, answer.country);
        }
        if let Some(fact) = answer.fun_fact.as_deref().or(answer.trivia.as_deref()) {
            println!("  {fact}");
        }
    }

    let result = engine.result(session_id).await?;
    let summary = engine.summary(session_id).await?;
    println!();
    println!(
        "{} scored {}/{} ({} wrong).",
        summary.handle, result.correct, result.total_questions, result.incorrect
    );
    println!("Picture: {}", summary.image_url);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingCommand.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite in the binary glue so services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let seeded = ensure_seeded(storage.destinations.as_ref(), &parsed.data_path).await?;

    match cmd {
        Command::Seed => {
            match seeded {
                SeedOutcome::Inserted(n) => println!("seeded {n} destinations"),
                SeedOutcome::AlreadySeeded { existing } => {
                    println!("already seeded ({existing} destinations)");
                }
            }
            Ok(())
        }
        Command::Play => {
            let handle = parsed.user.ok_or(ArgsError::MissingUser)?;
            let services = AppServices::from_storage(
                &storage,
                Clock::default_clock(),
                SharedRng::from_os_rng(),
                Arc::new(PexelsImageLookup::from_env()),
            )
            .await?;

            let user = services.users().resolve_or_create(&handle).await?;
            let engine = services.engine();
            let session_id = engine.create_session(user.handle().as_str()).await?;
            tracing::info!(%session_id, handle = %user.handle(), "starting game");

            play(&engine, session_id).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
