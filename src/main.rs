use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use music_analyzer::config::{load_env_file, EnvFile, Settings};
use music_analyzer::{server, Analyzer, AppState, CamelotTable, PathGuard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber, so RUST_LOG from .env applies
    let env_file = load_env_file();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match env_file {
        EnvFile::Loaded(path) => tracing::info!("Loaded environment from {}", path.display()),
        EnvFile::Absent => tracing::debug!("No .env file found"),
        EnvFile::Invalid(reason) => tracing::warn!("Ignoring malformed .env file: {}", reason),
    }

    let settings = Settings::from_env()?;
    let guard = PathGuard::new(&settings.safe_root)?;
    tracing::info!("Safe root: {}", guard.root().display());

    let state = Arc::new(AppState::new(guard, Analyzer::new(CamelotTable::standard())));

    server::serve(&settings, state)
        .await
        .with_context(|| format!("server on {} failed", settings.bind))?;

    Ok(())
}
