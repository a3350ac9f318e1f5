//! Glass console - drives a Glass backend from the command line.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use glass_timeline_lib::config::Config;
use glass_timeline_lib::models::{TimelineEntry, UploadFile};
use glass_timeline_lib::services::GlassSession;

const USAGE: &str = "usage: glass-console <upload <files...> | list | report <id> | limits | status>";

/// How often `upload` checks whether polling has settled.
const SETTLE_CHECK_INTERVAL: Duration = Duration::from_millis(500);

enum Command {
    Upload(Vec<String>),
    List,
    Report(String),
    Limits,
    Status,
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        let (name, rest) = args.split_first()?;
        match (name.as_str(), rest) {
            ("upload", files) if !files.is_empty() => Some(Command::Upload(files.to_vec())),
            ("list", []) => Some(Command::List),
            ("report", [id]) => Some(Command::Report(id.clone())),
            ("limits", []) => Some(Command::Limits),
            ("status", []) => Some(Command::Status),
            _ => None,
        }
    }
}

fn print_entry(entry: &TimelineEntry) {
    let started = chrono::DateTime::from_timestamp_millis(entry.started_at)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| entry.started_at.to_string());
    println!(
        "{:<40} {:<12} {:<28} {}",
        entry.timeline_id(),
        entry.status.as_str(),
        started,
        entry.filename
    );
}

/// Print notifications until every notifier handle is dropped.
fn spawn_printer(session: &GlassSession) -> JoinHandle<()> {
    let mut receiver = session.notifier().subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => {
                    println!("[{}] {}", notification.tone, notification.message)
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Dropped {} notifications", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            }
        }
    })
}

async fn wait_for_polls(session: &GlassSession) {
    let mut interval = tokio::time::interval(SETTLE_CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if session.timelines().pending_polls() == 0 {
                    return;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling outstanding polls");
                return;
            }
        }
    }
}

async fn run(session: &GlassSession, command: Command) -> bool {
    match command {
        Command::Upload(paths) => {
            session.start().await;
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                match UploadFile::from_path(path).await {
                    Ok(file) => files.push(file),
                    Err(e) => error!("Cannot read {}: {}", path, e),
                }
            }
            if files.is_empty() {
                return false;
            }

            let results = session.timelines().upload_files(files).await;
            wait_for_polls(session).await;

            for entry in session.timelines().entries().iter() {
                if results.iter().flatten().any(|id| id == entry.timeline_id()) {
                    print_entry(entry);
                }
            }
            results.iter().all(Option::is_some)
        }
        Command::List => {
            session.start().await;
            for entry in session.timelines().entries().iter() {
                print_entry(entry);
            }
            true
        }
        Command::Report(timeline_id) => match session.open_report(&timeline_id).await {
            Some(_) => {
                println!("{}", session.reports().manual_markdown());
                true
            }
            None => {
                error!("No report available for {}", timeline_id);
                false
            }
        },
        Command::Limits => match session.limits().load().await {
            Some(limits) => {
                println!("{}", limits.describe());
                true
            }
            None => false,
        },
        Command::Status => match session.system_status().await {
            Some(status) => {
                println!(
                    "chromadb: {} ({})",
                    status.chromadb.status, status.chromadb.model_name
                );
                println!(
                    "ffmpeg:   {} {}",
                    status.ffmpeg.status,
                    status.ffmpeg.version.as_deref().unwrap_or("")
                );
                status.is_ready()
            }
            None => false,
        },
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - GLASS_BACKEND_URL must be an http(s) URL, and is required in production");
            error!("  - GLASS_BACKEND_PORT, if set, must be a valid port");
            std::process::exit(1);
        }
    };

    info!("Glass backend: {} ({})", config.backend_url, config.environment);

    let session = match GlassSession::from_config(&config).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let printer = spawn_printer(&session);
    let ok = run(&session, command).await;
    session.dispose();

    // Dropping the last notifier handle closes the channel and ends the printer
    drop(session);
    if let Err(e) = printer.await {
        warn!("Notification printer ended abnormally: {}", e);
    }

    if !ok {
        std::process::exit(1);
    }
}
