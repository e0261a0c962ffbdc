//! Bibsync - batch reconciliation of catalog records against WorldCat
//!
//! Main entry point: logging, `.env` loading, argument dispatch.

mod commands;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging first so .env loading is visible.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables (credentials, endpoints) from .env.
    let dotenv_path = match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!(path = %path.display(), "loaded .env");
            Some(path)
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not load .env file");
            None
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match commands::parse(&args) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::from(2);
        }
    };

    match commands::execute(command, dotenv_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}
