use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::{error, info, warn};

use crate::components::VERIFY_BUTTON_ID;
use crate::error::BotError;
use crate::managers::VerifyOutcome;
use crate::messages;
use crate::{Context, Data, Error};

/// Embeds hold at most 25 fields
const MAX_REPORT_FIELDS: usize = 25;

/// Post the verification prompt with its Verify button
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn setup_verify(
    ctx: Context<'_>,
    #[description = "Channel to post the prompt in (defaults to this one)"] channel: Option<
        serenity::GuildChannel,
    >,
) -> Result<(), Error> {
    let target = channel.map(|c| c.id).unwrap_or_else(|| ctx.channel_id());
    let icon_url = ctx.guild().and_then(|g| g.icon_url());

    let handle = ctx
        .send(
            poise::CreateReply::default()
                .content(format!("✨ Deploying verification in {}...", target.mention()))
                .ephemeral(true),
        )
        .await?;

    let button = serenity::CreateButton::new(VERIFY_BUTTON_ID)
        .label("Verify")
        .style(serenity::ButtonStyle::Success)
        .emoji('✨');
    let prompt = serenity::CreateMessage::new()
        .embed(messages::verification_prompt_embed(icon_url))
        .components(vec![serenity::CreateActionRow::Buttons(vec![button])]);

    let status = match target.send_message(ctx.http(), prompt).await {
        Ok(_) => {
            info!("Verification prompt posted in channel {}", target);
            format!("✨ Done! Deployed in {}", target.mention())
        }
        Err(e) => match BotError::from(e) {
            BotError::PermissionDenied { .. } => {
                warn!("Missing permissions to post verification prompt in {}", target);
                format!("❌ Missing permissions in {}!", target.mention())
            }
            other => {
                error!("Failed to post verification prompt in {}: {}", target, other);
                format!("❌ Error: {}", other)
            }
        },
    };

    handle
        .edit(ctx, poise::CreateReply::default().content(status))
        .await?;
    Ok(())
}

/// Show members who will be removed if they don't verify
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "KICK_MEMBERS"
)]
pub async fn pending_kicks(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let entries = ctx.data().verification_manager.pending_report(guild_id);

    if entries.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("✅ No users pending auto-kick!")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("⏰ Pending Auto-Kicks")
        .description("Users who will be kicked if they don't verify:")
        .color(messages::WARNING_COLOR);

    for entry in entries.iter().take(MAX_REPORT_FIELDS) {
        embed = embed.field(
            &entry.display_name,
            messages::kicks_in(entry.hours_remaining, entry.minutes_remaining),
            false,
        );
    }
    if entries.len() > MAX_REPORT_FIELDS {
        embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
            "…and {} more",
            entries.len() - MAX_REPORT_FIELDS
        )));
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Handle a click on the persistent Verify button
pub async fn handle_verify_button(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let user = &interaction.user;

    let reply = match interaction.guild_id {
        None => serenity::CreateInteractionResponseMessage::new().content(messages::guild_only()),
        Some(guild_id) => match data.verification_manager.verify(guild_id, user.id).await {
            Ok(VerifyOutcome::Verified) => serenity::CreateInteractionResponseMessage::new()
                .embed(messages::verified_embed(&user.mention().to_string())),
            Ok(VerifyOutcome::AlreadyVerified) => {
                serenity::CreateInteractionResponseMessage::new()
                    .content(messages::already_verified())
            }
            Err(e) if e.is_configuration() => {
                let roles = data.verification_manager.roles();
                warn!(
                    "Verification in guild {} needs roles '{}' and '{}': {}",
                    guild_id, roles.restricted, roles.full_access, e
                );
                serenity::CreateInteractionResponseMessage::new()
                    .content(messages::configuration_error())
            }
            Err(e) if e.is_permission() => {
                error!(
                    "Bot lacks permission to change roles of {} in guild {}: {}",
                    user.name, guild_id, e
                );
                serenity::CreateInteractionResponseMessage::new()
                    .content(messages::verification_failed(&e.to_string()))
            }
            Err(e) => {
                warn!("Verification failed for {} in guild {}: {}", user.name, guild_id, e);
                serenity::CreateInteractionResponseMessage::new()
                    .content(messages::verification_failed(&e.to_string()))
            }
        },
    };

    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(reply.ephemeral(true)),
        )
        .await?;
    Ok(())
}
