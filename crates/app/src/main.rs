use std::fmt;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::info;

use app::api::{AppState, router};
use app::config::{AppConfig, normalize_sqlite_url, parse_ttl, prepare_sqlite_file};
use app::seed::seed_demo;
use app::study_cli::run_study;
use flashdeck_core::model::{DeckId, DifficultyFilter};
use services::{AppServices, Clock, HttpCardStore, StartSessionError, StudyEngine};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDeckId { raw: String },
    InvalidDifficulty { raw: String },
    InvalidDbUrl { raw: String },
    MissingDeck,
    MissingToken,
    MissingUser,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDeckId { raw } => write!(f, "invalid --deck value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw} (easy, medium, hard or all)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingDeck => write!(f, "study requires --deck <id>"),
            ArgsError::MissingToken => write!(f, "--server requires --token or FLASHDECK_TOKEN"),
            ArgsError::MissingUser => write!(f, "local study requires --user <name>"),
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

fn require_db(args: &mut impl Iterator<Item = String>) -> Result<String, ArgsError> {
    let value = require_value(args, "--db")?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: value });
    }
    Ok(value)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  flashdeck serve [--db <sqlite_url>] [--bind <addr>] [--token-ttl-hours <n>]");
    eprintln!("  flashdeck study --deck <id> [--difficulty <easy|medium|hard|all>]");
    eprintln!("                  [--server <url> --token <token>] | [--db <sqlite_url> --user <name>]");
    eprintln!("  flashdeck seed  [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:flashdeck.sqlite3");
    eprintln!("  --bind 127.0.0.1:3000");
    eprintln!();
    eprintln!("Config file: flashdeck.toml ([database], [server], [client])");
    eprintln!("Environment:");
    eprintln!("  FLASHDECK_DB_URL, FLASHDECK_BIND, FLASHDECK_TOKEN_TTL_HOURS,");
    eprintln!("  FLASHDECK_SERVER, FLASHDECK_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Study,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "study" => Some(Self::Study),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

enum StudySource {
    Remote { server: String, token: String },
    Local { db_url: String, username: String },
}

struct StudyArgs {
    deck_id: DeckId,
    filter: DifficultyFilter,
    source: StudySource,
}

/// Apply `serve`/`seed` flags on top of the loaded config.
fn parse_server_flags(
    config: &mut AppConfig,
    args: &mut impl Iterator<Item = String>,
    allow_bind: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => config.db_url = require_db(args)?,
            "--bind" if allow_bind => config.bind = require_value(args, "--bind")?,
            "--token-ttl-hours" if allow_bind => {
                let raw = require_value(args, "--token-ttl-hours")?;
                config.token_ttl_hours = parse_ttl("--token-ttl-hours", &raw)?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg).into()),
        }
    }
    Ok(())
}

fn parse_study(
    config: &AppConfig,
    args: &mut impl Iterator<Item = String>,
) -> Result<StudyArgs, ArgsError> {
    let mut deck_id = None;
    let mut filter = DifficultyFilter::All;
    let mut server = config.server.clone();
    let mut token = config.token.clone();
    let mut db_url = None;
    let mut username = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--deck" => {
                let value = require_value(args, "--deck")?;
                let parsed = value
                    .parse::<DeckId>()
                    .map_err(|_| ArgsError::InvalidDeckId { raw: value.clone() })?;
                deck_id = Some(parsed);
            }
            "--difficulty" => {
                let value = require_value(args, "--difficulty")?;
                filter = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidDifficulty { raw: value.clone() })?;
            }
            "--server" => server = Some(require_value(args, "--server")?),
            "--token" => token = Some(require_value(args, "--token")?),
            "--db" => db_url = Some(require_db(args)?),
            "--user" => username = Some(require_value(args, "--user")?),
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    let deck_id = deck_id.ok_or(ArgsError::MissingDeck)?;
    // An explicit --db or --user selects local mode even if a server is configured.
    let source = match server {
        Some(server) if db_url.is_none() && username.is_none() => StudySource::Remote {
            server,
            token: token.ok_or(ArgsError::MissingToken)?,
        },
        _ => StudySource::Local {
            db_url: db_url.unwrap_or_else(|| config.db_url.clone()),
            username: username.ok_or(ArgsError::MissingUser)?,
        },
    };

    Ok(StudyArgs {
        deck_id,
        filter,
        source,
    })
}

async fn open_services(
    config: &AppConfig,
    db_url: &str,
) -> Result<AppServices, Box<dyn std::error::Error>> {
    let db_url = normalize_sqlite_url(db_url);
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::default(), config.token_ttl_hours).await?;
    Ok(services)
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let services = open_services(&config, &config.db_url).await?;
    services.auth().purge_expired_tokens().await?;

    let listener = TcpListener::bind(&config.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(AppState::new(services))).await?;
    Ok(())
}

async fn study(config: AppConfig, args: StudyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = match args.source {
        StudySource::Remote { server, token } => {
            info!(server = %server, "studying against remote server");
            StudyEngine::new(Clock::default(), Arc::new(HttpCardStore::new(server, token)))
        }
        StudySource::Local { db_url, username } => {
            let services = open_services(&config, &db_url).await?;
            let principal = services.auth().principal_for(&username).await?;
            services.local_study_engine(principal)
        }
    };

    let session = match engine.start_session(args.deck_id, args.filter).await {
        Ok(session) => session,
        Err(e @ StartSessionError::EmptySet { .. }) => {
            println!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let summary = run_study(session, stdin, &mut stdout).await?;
    info!(
        deck_id = %summary.deck_id,
        studied = summary.stats.studied_cards(),
        accuracy = summary.accuracy,
        "study session ended"
    );
    Ok(())
}

async fn seed(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let services = open_services(&config, &config.db_url).await?;
    let report = seed_demo(&services).await?;
    println!(
        "demo deck {} ready (login demo / {}, {} new cards)",
        report.deck_id,
        app::seed::DEMO_PASSWORD,
        report.created_cards
    );
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
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

    app::init_tracing();
    let mut config = AppConfig::load()?;

    match cmd {
        Command::Serve => {
            parse_server_flags(&mut config, &mut argv, true)?;
            serve(config).await
        }
        Command::Seed => {
            parse_server_flags(&mut config, &mut argv, false)?;
            seed(config).await
        }
        Command::Study => {
            let args = parse_study(&config, &mut argv).inspect_err(|_| print_usage())?;
            study(config, args).await
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
