use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tracing::{debug, info};

use crate::managers::{JoinOutcome, MemberJoin};
use crate::{Data, Error};

/// Handle when a new member joins the guild
pub async fn handle_member_add(
    _ctx: &serenity::Context,
    new_member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = new_member.guild_id;
    info!(
        "New member joined: {} in guild {}",
        new_member.user.name, guild_id
    );

    let join = MemberJoin {
        guild_id,
        user_id: new_member.user.id,
        display_name: new_member.display_name().to_string(),
        joined_at: new_member
            .joined_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.unix_timestamp(), 0)),
    };

    let outcome = data.verification_manager.handle_member_joined(join).await?;
    if outcome == JoinOutcome::AlreadyPending {
        debug!("{} is already pending verification", new_member.user.name);
    }
    Ok(())
}

/// Handle a change to a member's roles
pub async fn handle_member_update(
    _ctx: &serenity::Context,
    old: Option<&serenity::Member>,
    event: &serenity::GuildMemberUpdateEvent,
    data: &Data,
) -> Result<(), Error> {
    // Without a cached copy we cannot tell what changed; treat every current
    // role as new. Clearing an already-cleared record is harmless.
    let before: &[serenity::RoleId] = old.map(|m| m.roles.as_slice()).unwrap_or(&[]);

    data.verification_manager
        .handle_roles_changed(event.guild_id, event.user.id, before, &event.roles)
        .await?;
    Ok(())
}
