//! Parrot Discord Bot - Main Entry Point

mod commands;
mod cooldown;
mod gateway;
mod ipc_routes;

use anyhow::Result;
use clap::Parser;
use cooldown::CooldownManager;
use dashmap::DashMap;
use parrot_common::{logging, GuildId};
use parrot_config::{Config, ConfigLoader};
use parrot_telephone::{CallRelay, LineStore, RelaySettings, SledLineStore};
use poise::serenity_prelude::{self as serenity, GatewayIntents};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Shared application state accessible across commands and event handlers
pub struct Data {
    /// Application configuration
    pub config: Arc<Config>,
    /// Persistent per-guild telephone lines
    pub store: Arc<dyn LineStore>,
    /// The call relay state machine
    pub relay: Arc<CallRelay>,
    /// Per-guild dial cooldowns
    pub cooldowns: CooldownManager,
    /// Guilds with a dial currently running
    pub dials_in_flight: DashMap<GuildId, ()>,
    /// The last guild each guild dialed, for `/redial`
    pub last_dialed: DashMap<GuildId, GuildId>,
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("config", &"<Config>")
            .field("store", &"<LineStore>")
            .field("relay", &"<CallRelay>")
            .field("dials_in_flight", &self.dials_in_flight.len())
            .finish()
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Log level override
    #[arg(short, long)]
    log_level: Option<String>,
}

fn relay_settings(config: &Config) -> RelaySettings {
    let telephone = &config.telephone;
    RelaySettings {
        ring_timeout: Duration::from_secs(telephone.ring_timeout_seconds),
        call_timeout: Duration::from_secs(telephone.call_timeout_seconds),
        idle_timeout: Duration::from_secs(telephone.idle_timeout_seconds),
        rate_limit_messages: telephone.rate_limit_messages,
        rate_limit_window: Duration::from_secs(telephone.rate_limit_window_seconds),
        max_content_chars: telephone.max_content_chars,
    }
}

/// Global error handler for the framework
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command '{}': {:?}", ctx.command().name, error);
        }
        error => {
            error!("Other error: {:?}", error);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => ConfigLoader::load_config(path)?,
        None => ConfigLoader::load()?,
    };

    // Initialize logging; the CLI flag wins over the config file
    logging::init_logging(logging::LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        pretty_format: config.logging.colored,
        file_path: config.logging.file.clone(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    info!("Starting Parrot Discord Bot");

    // Validate Discord token
    if config.discord.token.is_empty() {
        anyhow::bail!("Discord token is required but not provided in configuration");
    }

    let config = Arc::new(config);
    let store: Arc<dyn LineStore> = Arc::new(SledLineStore::open(&config.database.path)?);
    let relay = Arc::new(CallRelay::new(store.clone(), relay_settings(&config)));
    info!("Line store opened at {}", config.database.path);

    let data = Data {
        config: config.clone(),
        store: store.clone(),
        relay: relay.clone(),
        cooldowns: CooldownManager::new(),
        dials_in_flight: DashMap::new(),
        last_dialed: DashMap::new(),
    };

    // Message content is required to observe pickup/hangup and relay traffic
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    // Set up Poise framework
    let setup_config = config.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::dial(),
                commands::redial(),
                commands::reversedial(),
                commands::wire(),
                commands::block(),
                commands::unblock(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.discord.prefix.clone()),
                mention_as_prefix: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {}", ready.user.name);
                info!("Connected to {} guilds", ready.guilds.len());

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Slash commands registered globally");

                if setup_config.ipc.enabled {
                    let server = Arc::new(ipc_routes::build_ipc_server(
                        &setup_config.ipc.secret,
                        relay.clone(),
                        store.clone(),
                        ctx.cache.clone(),
                    ));
                    let bind = setup_config.ipc.bind_address.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.serve(&bind).await {
                            error!(error = %e, "IPC server exited");
                        }
                    });
                }

                Ok(data)
            })
        })
        .build();

    info!("Poise framework configured");

    // Create Discord client
    let mut client = serenity::ClientBuilder::new(&config.discord.token, intents)
        .framework(framework)
        .await?;

    // Set up graceful shutdown handling
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {:?}", e);
            return;
        }

        info!("Received shutdown signal, starting graceful shutdown");
        shard_manager.shutdown_all().await;
        info!("Discord client shutdown complete");
    });

    info!("Parrot is starting up...");

    // Start the bot
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
        return Err(why.into());
    }

    info!("Parrot has shut down");
    Ok(())
}
