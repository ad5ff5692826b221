mod bot;
mod config;
mod convert;
mod error;
mod keepalive;
mod llm;
mod platform;
mod search;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may live in a local .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,learnaura=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if config.telegram.bot_token.is_empty() {
        anyhow::bail!("Telegram bot token is not set (TELEGRAM_TOKEN or [telegram] bot_token)");
    }

    info!("Configuration loaded successfully");
    info!("  Model: {}", config.gemini.model);
    info!("  Converter: {}", config.converter.soffice_path.display());
    info!("  Work dir: {}", config.converter.work_dir.display());
    info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);

    // The keep-alive server runs on its own; a taken port aborts startup
    let listener =
        keepalive::bind(SocketAddr::from(([0, 0, 0, 0], config.keepalive.port))).await?;
    let keepalive = keepalive::spawn(listener);

    let state = Arc::new(AppState::new(config));

    info!("Bot is running...");
    platform::telegram::run(state).await?;

    keepalive.abort();
    Ok(())
}
