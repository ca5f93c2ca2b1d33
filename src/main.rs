use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Discord bot that gates new members behind a 24-hour verification window
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod clock;
mod commands;
mod components;
mod config;
mod error;
mod events;
mod gateway;
mod logging;
mod managers;
mod messages;
mod state;
mod web;

#[cfg(test)]
mod test_support;

use commands::{hello, help, pending_kicks, ping, setup_verify};
use components::ComponentRegistry;
use config::{Settings, SWEEP_INTERVAL};
use events::{handle_component_interaction, handle_member_add, handle_member_update};
use gateway::SerenityGateway;
use managers::{
    create_shared_verification_manager, run_reconciliation_loop, KickFailurePolicy,
    SharedVerificationManager,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub verification_manager: SharedVerificationManager,
    pub components: ComponentRegistry,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = handle_member_add(ctx, new_member, data).await {
                error!(
                    "Error assigning role to {} in guild {}: {}",
                    new_member.user.name, new_member.guild_id, e
                );
            }
        }
        serenity::FullEvent::GuildMemberUpdate {
            old_if_available,
            event,
            ..
        } => {
            if let Err(e) = handle_member_update(ctx, old_if_available.as_ref(), event, data).await {
                error!("Failed to handle role change for {}: {}", event.user.name, e);
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Err(e) = handle_component_interaction(ctx, interaction, data).await {
                error!("Failed to handle interaction: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Log the application id encoded in the first segment of the token
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));
    if let Some(id_str) = decoded.ok().and_then(|d| String::from_utf8(d).ok()) {
        info!(
            "Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)",
            id_str, id_str
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let settings = Settings::from_env()?;
    logging::init(settings.log_level);

    log_bot_id(&settings.token);
    info!(
        "Restricted role: '{}', full-access role: '{}'",
        settings.roles.restricted, settings.roles.full_access
    );

    // Extract CLI flags for use in setup
    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let roles = settings.roles.clone();
    let keep_alive_port = settings.keep_alive_port;

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                ping(),
                hello(),
                commands::info(),
                help(),
                setup_verify(),
                pending_kicks(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let gateway = Arc::new(SerenityGateway::new(ctx.http.clone(), ctx.cache.clone()));
                let verification_manager = create_shared_verification_manager(
                    gateway,
                    clock::system_clock(),
                    roles,
                    KickFailurePolicy::DropAfterAttempt,
                );

                // Determine which guilds to register commands for
                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id {
                    vec![serenity::GuildId::new(gid)]
                } else {
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                // Start enforcing deadlines now that the client is ready
                tokio::spawn(run_reconciliation_loop(
                    verification_manager.clone(),
                    SWEEP_INTERVAL,
                    shutdown_rx,
                ));

                if let Some(port) = keep_alive_port {
                    let web_verification_manager = verification_manager.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            web::start_keep_alive_server(port, web_verification_manager).await
                        {
                            error!("Keep-alive server error: {}", e);
                        }
                    });
                } else {
                    info!("Keep-alive server disabled (KEEP_ALIVE_PORT=0)");
                }

                info!("Verification system loaded!");
                Ok(Data {
                    verification_manager,
                    components: ComponentRegistry::with_defaults(),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    // Log which privileged intents we're requesting
    let privileged_intents: Vec<&str> = vec![
        if intents.contains(serenity::GatewayIntents::MESSAGE_CONTENT) {
            Some("MESSAGE_CONTENT")
        } else {
            None
        },
        if intents.contains(serenity::GatewayIntents::GUILD_MEMBERS) {
            Some("GUILD_MEMBERS")
        } else {
            None
        },
    ]
    .into_iter()
    .flatten()
    .collect();

    info!("Requesting privileged intents: {:?}", privileged_intents);

    let mut client = serenity::ClientBuilder::new(&settings.token, intents)
        .framework(framework)
        .await?;

    // Ctrl-C stops the sweep loop between cycles, then the shards
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        // Check if it's a disallowed intents error
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("The following privileged intents need to be enabled in the Discord Developer Portal:");
            for intent in &privileged_intents {
                error!("  - {}", intent);
            }
            error!("Go to https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable these in Discord Developer Portal: {:?}",
                privileged_intents
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
