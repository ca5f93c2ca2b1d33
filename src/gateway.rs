//! Membership gateway: the role and membership operations the verification
//! lifecycle needs from Discord.
//!
//! Every method is an await point. Callers must not assume that state read
//! before a call still holds after it returns.

use async_trait::async_trait;
use poise::serenity_prelude::{Cache, GuildId, Http, RoleId, UserId};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

#[async_trait]
pub trait MembershipGateway: Send + Sync {
    /// Look up a guild role by its exact name
    async fn find_role(&self, guild_id: GuildId, name: &str) -> Result<Option<RoleId>>;

    /// Current roles of a member, or `None` if they are not in the guild
    async fn member_roles(&self, guild_id: GuildId, user_id: UserId)
        -> Result<Option<Vec<RoleId>>>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()>;

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()>;

    /// Remove the member from the guild
    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()>;
}

pub type SharedGateway = Arc<dyn MembershipGateway>;

/// Gateway backed by serenity's HTTP client, with role names resolved from
/// the cache when the guild is cached.
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn cached_role(&self, guild_id: GuildId, name: &str) -> Option<RoleId> {
        let guild = self.cache.guild(guild_id)?;
        guild
            .roles
            .iter()
            .find(|(_, role)| role.name == name)
            .map(|(id, _)| *id)
    }
}

#[async_trait]
impl MembershipGateway for SerenityGateway {
    async fn find_role(&self, guild_id: GuildId, name: &str) -> Result<Option<RoleId>> {
        if let Some(role_id) = self.cached_role(guild_id, name) {
            return Ok(Some(role_id));
        }

        debug!("Role '{}' not cached for guild {}, fetching", name, guild_id);
        let roles = self.http.get_guild_roles(guild_id).await?;
        Ok(roles.into_iter().find(|r| r.name == name).map(|r| r.id))
    }

    async fn member_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<Vec<RoleId>>> {
        match self.http.get_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(member.roles)),
            Err(e) => {
                let err = crate::error::BotError::from(e);
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()> {
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> Result<()> {
        self.http.kick_member(guild_id, user_id, Some(reason)).await?;
        Ok(())
    }
}
