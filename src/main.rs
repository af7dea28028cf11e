//! Radio bot CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use rockbot::catalog::StationCatalog;
use rockbot::config::Config;
use rockbot::{Radio, RadioKey, bot};
use serenity::prelude::GatewayIntents;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rockbot")]
#[command(about = "Single-server Discord radio bot with a persistent control panel")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Rock & Bot...");

    // A missing token aborts startup; everything else degrades gracefully.
    let config = Config::load().context("failed to load configuration from environment")?;
    let catalog = StationCatalog::load(config.stations_file.as_deref())
        .context("failed to load station catalog")?;

    tracing::info!(
        stations = catalog.entries().len(),
        prefix = %config.prefix,
        panel = config.panel_channel.is_some(),
        "configuration loaded"
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let manager = Songbird::serenity();
    let mut client = serenity::Client::builder(&config.token, intents)
        .event_handler(bot::Handler)
        .register_songbird_with(manager.clone())
        .await
        .context("failed to build the Discord client")?;

    let radio = Arc::new(Radio::new(
        config,
        catalog,
        client.http.clone(),
        client.cache.clone(),
        manager,
    ));
    {
        let mut data = client.data.write().await;
        data.insert::<RadioKey>(radio);
    }

    tokio::select! {
        result = client.start() => result.context("client ended unexpectedly")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
    }

    tracing::info!("Rock & Bot stopped");
    Ok(())
}
