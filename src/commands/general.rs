use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is responsive
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    let latency = ctx.ping().await.as_millis();
    ctx.send(poise::CreateReply::default()
        .content(format!("🏓 Pong! Latency: {}ms", latency)))
        .await?;
    Ok(())
}

/// Say hello to the bot
#[poise::command(slash_command)]
pub async fn hello(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(format!("👋 Hello, {}!", ctx.author().mention())).await?;
    Ok(())
}

/// Get information about the bot
#[poise::command(slash_command)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let guild_count = ctx.cache().guilds().len();
    let latency = ctx.ping().await.as_millis();

    let embed = serenity::CreateEmbed::new()
        .title("Bot Information")
        .description("Gatekeeper: new members verify within 24 hours or are removed")
        .field("Servers", guild_count.to_string(), true)
        .field("Latency", format!("{}ms", latency), true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Bot ID: {}",
            ctx.framework().bot_id
        )))
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Bot Commands")
        .description("Available commands:")
        .field("/ping", "Check if the bot is responsive", false)
        .field("/info", "Get information about the bot", false)
        .field("/setup_verify", "Post the verification prompt (Admin)", false)
        .field("/pending_kicks", "List members who have not verified yet (Admin)", false)
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}
