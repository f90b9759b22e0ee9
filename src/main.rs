use anyhow::Result;
use clap::Parser;
use std::{fs::OpenOptions, path::Path, sync::Mutex};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;
mod config;
mod llm;
mod provision;
mod session;
mod tui;
mod utils;

use cli::Cli;

#[tokio::main]
async fn main() {
    // Leave raw mode before reporting, otherwise the message is lost on the alternate screen
    std::panic::set_hook(Box::new(|panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        std::process::exit(1);
    }));

    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env file is fine
        if !e.not_found() {
            eprintln!("Failed to load .env file: {}", e);
        }
    }

    // Execute CLI command
    if let Err(e) = execute().await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. With `log_file` set, output goes there instead of stderr
/// so the terminal UI is not disturbed.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if debug { "gguf_chat=debug" } else { "gguf_chat=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", path.display(), e))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

async fn execute() -> Result<()> {
    let cli = Cli::parse();
    cli.execute().await
}
