//! Chorus rooms - event-driven CLI
//!
//! Feeds JSON runtime events through the session manager and writes each
//! sent message as a JSON line on stdout. Logs go to stderr.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use chorus_rooms::{InMemoryRuntime, InboundEvent, RoomsConfig, SessionManager};
use clap::Parser;
use cli::{Cli, Command};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RoomsConfig::from_file(path)?,
        None => RoomsConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    let mut manager = SessionManager::new(InMemoryRuntime::new(), &config);

    match cli.command {
        Command::Serve => {
            info!("Reading events from stdin");
            let stdin = BufReader::new(tokio::io::stdin());
            run_events(&mut manager, stdin).await
        }
        Command::Replay { path } => {
            info!(path = %path.display(), "Replaying event file");
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            run_events(&mut manager, BufReader::new(file)).await
        }
    }
}

/// Handles every line from `reader` and prints the resulting messages.
#[instrument(skip_all)]
async fn run_events<Reader>(
    manager: &mut SessionManager<InMemoryRuntime>,
    reader: Reader,
) -> Result<()>
where
    Reader: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match InboundEvent::from_json(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping malformed event");
                continue;
            }
        };

        if let Err(e) = manager.handle(&event) {
            warn!(error = %e, scope = %event.scope, "Event rejected");
            continue;
        }
        handled += 1;

        for sent in manager.runtime_mut().drain_sent() {
            let mut out = serde_json::to_string(&sent)?;
            out.push('\n');
            stdout.write_all(out.as_bytes()).await?;
        }
        stdout.flush().await?;
    }

    debug!(handled, "Input exhausted");
    info!(rooms = manager.session_count(), "Done");
    Ok(())
}
