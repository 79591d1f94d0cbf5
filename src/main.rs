// This is the entry point of the voice points bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (storage, liveness endpoint)
// - `discord/` = Discord-specific adapters (commands, award loop, posting)
//
// This file's job is to:
// 1. Load configuration
// 2. Set up logging
// 3. Initialize services (dependency injection)
// 4. Set up the Discord framework and start the award loop

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::award::AwardService;
use crate::core::points::PointsService;
use crate::core::roles::RoleSynchronizer;
use crate::discord::commands::presence;
use crate::discord::{award_loop, Data, Error};
use crate::infra::health;
use crate::infra::points::JsonPointsStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

/// Send every log line to the append-only log file.
fn init_logging(path: &str) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_logging(&config.log_file)?;
    tracing::info!("{} role tier(s) configured", config.tiers.len());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let store = JsonPointsStore::open(&config.db_path)
        .with_context(|| format!("Failed to open points database {}", config.db_path))?;
    let points_service = Arc::new(PointsService::new(store));

    let role_sync = RoleSynchronizer::new(config.tiers.clone(), config.grant_debounce);
    let award_service = Arc::new(AwardService::new(Arc::clone(&points_service), role_sync));

    let port = config.http_port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            tracing::error!("Liveness endpoint stopped: {}", e);
        }
    });

    let token = config.token.clone();
    let data = Data {
        points: Arc::clone(&points_service),
        awards: Arc::clone(&award_service),
        config: Arc::new(config),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS // Member cache: bot flags, roles, nicknames
        | serenity::GatewayIntents::GUILD_VOICE_STATES // Who sits in which voice channel
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT; // Required for `!` commands

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::points::points(),
                discord::commands::points::givepoints(),
                discord::commands::points::setpoints(),
                discord::commands::points::compare(),
                discord::commands::points::top(),
                discord::commands::help::aide(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "{} used {}",
                        ctx.author().name,
                        ctx.command().qualified_name
                    );
                })
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("Connected as {} ({})", ready.user.name, ready.user.id);

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                presence::on_ready(ctx);
                award_loop::start_award_loop(ctx, &data);

                Ok::<Data, Error>(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;

    Ok(())
}
