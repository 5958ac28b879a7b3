//! exo-search - interactive candidate search and prediction driver
//!
//! Line-based front end over one `SearchSession`. Plain text replaces the
//! query; commands start with `:`. The typeahead window and both request
//! lifecycles are printed after every line.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use exo_common::config::{self, TomlConfig};
use exo_common::events::SessionEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exo_search::{
    Candidate, Catalog, KeyEvent, LightcurveOutcome, PredictionOutcome, RequestLifecycle,
    SearchSession,
};

/// Command-line arguments for exo-search
#[derive(Parser, Debug)]
#[command(name = "exo-search")]
#[command(about = "Exoplanet candidate search and prediction")]
#[command(version)]
struct Args {
    /// Prediction service base URL (overrides EXO_BACKEND_URL and the config file)
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Config file (overrides EXO_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog to load at startup
    #[arg(long, default_value = "kepler", env = "EXO_CATALOG")]
    catalog: String,
}

/// One REPL line
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Query(String),
    Key(KeyEvent),
    Focus,
    Blur,
    Pick(usize),
    Exact,
    Catalog(String),
    Predict,
    Lightcurve,
    Status,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Command::Query(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        match (name, arg) {
            ("down", None) => Ok(Command::Key(KeyEvent::ArrowDown)),
            ("up", None) => Ok(Command::Key(KeyEvent::ArrowUp)),
            ("enter", None) => Ok(Command::Key(KeyEvent::Enter)),
            ("esc", None) => Ok(Command::Key(KeyEvent::Escape)),
            ("focus", None) => Ok(Command::Focus),
            ("blur", None) => Ok(Command::Blur),
            ("pick", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Command::Pick(n)),
                _ => Err(format!("invalid option number: {}", n)),
            },
            ("exact", None) => Ok(Command::Exact),
            ("catalog", Some(name)) => Ok(Command::Catalog(name.to_string())),
            ("predict", None) => Ok(Command::Predict),
            ("lightcurve", None) => Ok(Command::Lightcurve),
            ("status", None) => Ok(Command::Status),
            ("help" | "h", None) => Ok(Command::Help),
            ("q" | "quit" | "exit", None) => Ok(Command::Quit),
            _ => Err(format!("unknown command: {}", line)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let toml_config = config::load_or_default(config_path.as_deref());

    init_tracing(&toml_config)?;

    info!("Starting exo-search v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let (backend_url, _) = config::resolve_backend_url(args.backend_url.as_deref(), &toml_config);
    let session = SearchSession::connect(&backend_url, &toml_config)
        .context("Failed to create backend client")?;
    info!(session_id = %session.id(), "Session started against {}", backend_url);

    spawn_notifications(&session);

    let catalog: Catalog = args
        .catalog
        .parse()
        .with_context(|| format!("Invalid --catalog value {}", args.catalog))?;
    if let Err(e) = session.switch_catalog(catalog).await {
        warn!("{}", e);
    }

    repl(&session).await
}

/// `RUST_LOG` wins; otherwise the `[logging]` level from the config file
fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));

    let file_layer = match &toml_config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Print failure notifications as they arrive
fn spawn_notifications(session: &SearchSession) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.is_error() => {
                    if let Some(message) = failure_message(&event) {
                        eprintln!("! {}", message);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Notification printer lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn failure_message(event: &SessionEvent) -> Option<&str> {
    match event {
        SessionEvent::CatalogLoadFailed { message, .. }
        | SessionEvent::PredictionFailed { message, .. }
        | SessionEvent::LightcurveFailed { message, .. }
        | SessionEvent::ResultSaveFailed { message, .. } => Some(message),
        _ => None,
    }
}

async fn repl(session: &SearchSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("exo-search | type to search, :help for commands, :q to quit");
    print_status(session).await;

    loop {
        print!("search> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        run(session, command).await;
        print_status(session).await;
    }

    info!("Session {} finished", session.id());
    Ok(())
}

async fn run(session: &SearchSession, command: Command) {
    let now = Instant::now();

    match command {
        Command::Query(text) => session.input(&text).await,
        Command::Key(event) => report_commit(session.key(event, now).await),
        Command::Focus => session.focus().await,
        Command::Blur => session.blur(now).await,
        Command::Pick(n) => {
            let view = session.view().await;
            match view.window.get(n - 1) {
                Some(candidate) => report_commit(session.select_option(candidate, now).await),
                None => println!("no option {} in the visible window", n),
            }
        }
        Command::Exact => match session.commit_exact().await {
            Ok(None) => println!("no candidate named {:?}", session.view().await.query),
            other => report_commit(other),
        },
        Command::Catalog(name) => match name.parse::<Catalog>() {
            Ok(catalog) => {
                if let Err(e) = session.switch_catalog(catalog).await {
                    println!("{}", e);
                }
            }
            Err(e) => println!("{}", e),
        },
        Command::Predict => match session.predict().await {
            Ok(PredictionOutcome::Succeeded(_)) | Ok(PredictionOutcome::Failed(_)) => {}
            Ok(PredictionOutcome::Superseded) => println!("(superseded)"),
            Err(e) => println!("{}", e),
        },
        Command::Lightcurve => match session.generate_lightcurve().await {
            Ok(LightcurveOutcome::Succeeded(_)) | Ok(LightcurveOutcome::Failed(_)) => {}
            Ok(LightcurveOutcome::Superseded) => println!("(superseded)"),
            Err(e) => println!("{}", e),
        },
        Command::Status => {
            let status = session.status().await;
            match serde_json::to_string_pretty(&status) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("{}", e),
            }
        }
        Command::Help => print_help(),
        Command::Quit => {}
    }
}

fn report_commit(result: exo_search::SearchResult<Option<Candidate>>) {
    match result {
        Ok(Some(candidate)) => println!("commit: {}", candidate),
        Ok(None) => {}
        Err(e) => println!("{}", e),
    }
}

async fn print_status(session: &SearchSession) {
    session.poll(Instant::now()).await;
    let view = session.view().await;

    let catalog = view
        .catalog
        .map(|c| c.candidate_label())
        .unwrap_or("(no catalog)");
    println!("--------------------");
    println!("{}: {:?}", catalog, view.query);

    if view.loading {
        println!("  loading candidates...");
    } else if let Some(error) = &view.last_error {
        println!("  {}", error);
    }

    if view.is_open {
        for (i, candidate) in view.window.iter().enumerate() {
            println!("  {}. {}", i + 1, candidate);
        }
        if view.no_match {
            println!("  (no matching candidates)");
        } else if view.total_matches > view.window.len() {
            println!(
                "  [{}-{} of {}]",
                view.scroll_offset + 1,
                view.scroll_offset + view.window.len(),
                view.total_matches
            );
        }
    }

    let selection = session.selection().await;
    if let Some(candidate) = selection.candidate() {
        println!("selected: {}", candidate);
    }

    match session.prediction().await {
        RequestLifecycle::Idle => {}
        RequestLifecycle::Loading => println!("prediction: loading..."),
        RequestLifecycle::Succeeded(result) => println!(
            "prediction: {:.2}% {} ({}, archive: {})",
            result.confidence_percent,
            if result.is_exoplanet {
                "exoplanet"
            } else {
                "not an exoplanet"
            },
            result.model_version,
            result.external_classification
        ),
        RequestLifecycle::Failed(reason) => println!("prediction: {}", reason),
    }

    match session.lightcurve().await {
        RequestLifecycle::Idle => {}
        RequestLifecycle::Loading => println!("lightcurve: generating..."),
        RequestLifecycle::Succeeded(artifact) => {
            println!("lightcurve: {} <{}>", artifact.title, artifact.url)
        }
        RequestLifecycle::Failed(reason) => println!("lightcurve: {}", reason),
    }
}

fn print_help() {
    println!("  <text>            replace the query");
    println!("  :down / :up       scroll the option window");
    println!("  :enter            commit the first visible option");
    println!("  :esc              close the dropdown");
    println!("  :focus / :blur    focus or leave the search box");
    println!("  :pick <n>         click the nth visible option");
    println!("  :exact            commit the query if it names a candidate");
    println!("  :catalog <name>   switch catalog (kepler, tess)");
    println!("  :predict          predict the selected candidate");
    println!("  :lightcurve       generate the lightcurve for the prediction");
    println!("  :status           dump the session state as JSON");
    println!("  :q                quit");
}
