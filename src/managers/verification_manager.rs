use chrono::{DateTime, Utc};
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clock::SharedClock;
use crate::config::RoleNames;
use crate::error::{BotError, Result};
use crate::gateway::SharedGateway;
use crate::state::{PendingStore, PendingVerification};

const JOIN_REASON: &str = "New member awaiting verification";
const VERIFY_REASON: &str = "Member verified";
pub const KICK_REASON: &str = "Did not verify within 24 hours";

/// A member-joined event
#[derive(Debug, Clone)]
pub struct MemberJoin {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub display_name: String,
    /// Join timestamp from the event, if the gateway supplied one
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Restricted role assigned and a deadline started
    Registered,
    /// Already pending; deadline left untouched
    AlreadyPending,
    /// The guild has no restricted role, nothing was done
    RestrictedRoleMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

/// What happens to a record whose kick call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KickFailurePolicy {
    /// One enforcement attempt per expiry; the record is dropped either way
    #[default]
    DropAfterAttempt,
    /// Keep the record so the next sweep tries again
    RetryNextSweep,
}

/// Result of enforcing a single expired record
#[derive(Debug)]
pub enum Enforcement {
    Kicked,
    /// Member holds full access by now; record dropped, nobody kicked
    AlreadyVerified,
    /// Member is no longer in the guild; record dropped
    Departed,
    /// Kick call failed; record dropped or kept per policy
    KickFailed(BotError),
    /// Live state could not be read; record kept for the next sweep
    Deferred(BotError),
}

/// Tally of one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub kicked: usize,
    pub already_verified: usize,
    pub departed: usize,
    pub failed: usize,
    pub deferred: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: &Enforcement) {
        match outcome {
            Enforcement::Kicked => self.kicked += 1,
            Enforcement::AlreadyVerified => self.already_verified += 1,
            Enforcement::Departed => self.departed += 1,
            Enforcement::KickFailed(_) => self.failed += 1,
            Enforcement::Deferred(_) => self.deferred += 1,
        }
    }
}

/// One line of the pending report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReportEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub hours_remaining: i64,
    pub minutes_remaining: i64,
}

/// Owns the pending store and drives the verification lifecycle:
/// join registration, verification, role-change observation and
/// deadline enforcement.
pub struct VerificationManager {
    store: PendingStore,
    gateway: SharedGateway,
    clock: SharedClock,
    roles: RoleNames,
    kick_failure_policy: KickFailurePolicy,
}

impl VerificationManager {
    pub fn new(gateway: SharedGateway, clock: SharedClock, roles: RoleNames) -> Self {
        Self {
            store: PendingStore::new(),
            gateway,
            clock,
            roles,
            kick_failure_policy: KickFailurePolicy::default(),
        }
    }

    pub fn with_kick_failure_policy(mut self, policy: KickFailurePolicy) -> Self {
        self.kick_failure_policy = policy;
        self
    }

    /// Read-only view of the pending store
    pub fn store(&self) -> &PendingStore {
        &self.store
    }

    pub fn roles(&self) -> &RoleNames {
        &self.roles
    }

    async fn resolve_role(&self, guild_id: GuildId, name: &str) -> Result<RoleId> {
        self.gateway
            .find_role(guild_id, name)
            .await?
            .ok_or_else(|| BotError::RoleNotFound {
                name: name.to_string(),
            })
    }

    /// Restrict a newly joined member and start their grace period.
    ///
    /// A failed role assignment leaves the member unrestricted and
    /// unregistered; it is not retried.
    pub async fn handle_member_joined(&self, join: MemberJoin) -> Result<JoinOutcome> {
        let MemberJoin {
            guild_id,
            user_id,
            display_name,
            joined_at,
        } = join;

        if self.store.get(guild_id, user_id).is_some() {
            debug!("Duplicate join for pending member {} in guild {}", user_id, guild_id);
            return Ok(JoinOutcome::AlreadyPending);
        }

        let restricted = match self
            .gateway
            .find_role(guild_id, &self.roles.restricted)
            .await?
        {
            Some(role_id) => role_id,
            None => {
                warn!(
                    "Role '{}' does not exist in guild {}; not restricting {}",
                    self.roles.restricted, guild_id, display_name
                );
                return Ok(JoinOutcome::RestrictedRoleMissing);
            }
        };

        self.gateway
            .add_role(guild_id, user_id, restricted, JOIN_REASON)
            .await?;

        let join_time = joined_at.unwrap_or_else(|| self.clock.now());
        if !self
            .store
            .upsert_if_absent(guild_id, user_id, &display_name, join_time)
        {
            return Ok(JoinOutcome::AlreadyPending);
        }

        if let Some(record) = self.store.get(guild_id, user_id) {
            info!(
                "{} ({}) joined guild {} and received '{}'. Auto-kick scheduled for {}",
                display_name, user_id, guild_id, self.roles.restricted, record.deadline
            );
        }
        Ok(JoinOutcome::Registered)
    }

    /// Swap the restricted role for the full-access role.
    ///
    /// The pending record is only cleared once both role calls succeed. If
    /// the grant fails after the restricted role was removed, the record is
    /// kept so the sweep still enforces on it.
    pub async fn verify(&self, guild_id: GuildId, user_id: UserId) -> Result<VerifyOutcome> {
        let restricted = self.resolve_role(guild_id, &self.roles.restricted).await?;
        let full_access = self.resolve_role(guild_id, &self.roles.full_access).await?;

        let current = self
            .gateway
            .member_roles(guild_id, user_id)
            .await?
            .ok_or_else(|| BotError::NotFound {
                message: format!("member {} is not in guild {}", user_id, guild_id),
            })?;

        if current.contains(&full_access) {
            debug!("{} is already verified in guild {}", user_id, guild_id);
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        self.gateway
            .remove_role(guild_id, user_id, restricted, VERIFY_REASON)
            .await?;

        if let Err(e) = self
            .gateway
            .add_role(guild_id, user_id, full_access, VERIFY_REASON)
            .await
        {
            error!(
                "Member {} in guild {} lost '{}' but could not be granted '{}': {}",
                user_id, guild_id, self.roles.restricted, self.roles.full_access, e
            );
            return Err(BotError::RoleSwapIncomplete {
                source: Box::new(e),
            });
        }

        self.store.remove(guild_id, user_id);
        info!("Member {} verified in guild {}", user_id, guild_id);
        Ok(VerifyOutcome::Verified)
    }

    /// Clear the pending record when the full-access role shows up through
    /// any path, e.g. an admin granting it by hand.
    ///
    /// Returns whether a record was removed.
    pub async fn handle_roles_changed(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        before: &[RoleId],
        after: &[RoleId],
    ) -> Result<bool> {
        if self.store.get(guild_id, user_id).is_none() {
            return Ok(false);
        }

        let Some(full_access) = self
            .gateway
            .find_role(guild_id, &self.roles.full_access)
            .await?
        else {
            return Ok(false);
        };

        let granted = after.contains(&full_access) && !before.contains(&full_access);
        if granted && self.store.remove(guild_id, user_id) {
            info!(
                "Member {} received '{}' in guild {}; removed from auto-kick list",
                user_id, self.roles.full_access, guild_id
            );
            return Ok(true);
        }
        Ok(false)
    }

    /// Enforce every record whose deadline has passed.
    ///
    /// A failure for one member never stops the rest of the sweep.
    pub async fn sweep(&self) -> SweepReport {
        let expired = self.store.list_expired(self.clock.now());
        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };

        for record in expired {
            let outcome = self.enforce(&record).await;
            match &outcome {
                Enforcement::Kicked => info!(
                    "Kicked {} ({}) from guild {} for not verifying within 24 hours",
                    record.display_name, record.user_id, record.guild_id
                ),
                Enforcement::AlreadyVerified => debug!(
                    "{} ({}) verified before enforcement; dropping record",
                    record.display_name, record.user_id
                ),
                Enforcement::Departed => debug!(
                    "{} ({}) already left guild {}; dropping record",
                    record.display_name, record.user_id, record.guild_id
                ),
                Enforcement::KickFailed(e) => error!(
                    "Error kicking {} ({}) from guild {}: {}",
                    record.display_name, record.user_id, record.guild_id, e
                ),
                Enforcement::Deferred(e) => warn!(
                    "Could not check {} ({}) in guild {}, retrying next sweep: {}",
                    record.display_name, record.user_id, record.guild_id, e
                ),
            }
            report.record(&outcome);
        }

        report
    }

    async fn enforce(&self, record: &PendingVerification) -> Enforcement {
        let guild_id = record.guild_id;
        let user_id = record.user_id;

        // Live state only; the store may lag behind a verification that
        // raced with this sweep.
        let roles = match self.gateway.member_roles(guild_id, user_id).await {
            Ok(Some(roles)) => roles,
            Ok(None) => {
                self.store.remove_matching(record);
                return Enforcement::Departed;
            }
            Err(e) if e.is_not_found() => {
                self.store.remove_matching(record);
                return Enforcement::Departed;
            }
            Err(e) => return Enforcement::Deferred(e),
        };

        // Without a full-access role in the guild nobody counts as verified
        let full_access = match self.gateway.find_role(guild_id, &self.roles.full_access).await {
            Ok(role_id) => role_id,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Enforcement::Deferred(e),
        };

        if full_access.is_some_and(|role_id| roles.contains(&role_id)) {
            self.store.remove_matching(record);
            return Enforcement::AlreadyVerified;
        }

        match self.gateway.kick(guild_id, user_id, KICK_REASON).await {
            Ok(()) => {
                self.store.remove_matching(record);
                Enforcement::Kicked
            }
            Err(e) if e.is_not_found() => {
                self.store.remove_matching(record);
                Enforcement::Departed
            }
            Err(e) => {
                if self.kick_failure_policy == KickFailurePolicy::DropAfterAttempt {
                    self.store.remove_matching(record);
                }
                Enforcement::KickFailed(e)
            }
        }
    }

    /// Pending members of a guild with time left, soonest deadline first
    pub fn pending_report(&self, guild_id: GuildId) -> Vec<PendingReportEntry> {
        let now = self.clock.now();
        let mut records: Vec<PendingVerification> = self
            .store
            .list_all()
            .into_iter()
            .filter(|r| r.guild_id == guild_id)
            .collect();
        records.sort_by_key(|r| r.deadline);

        records
            .into_iter()
            .map(|r| {
                let seconds = r.time_remaining(now).num_seconds();
                PendingReportEntry {
                    user_id: r.user_id,
                    display_name: r.display_name,
                    hours_remaining: seconds / 3600,
                    minutes_remaining: (seconds % 3600) / 60,
                }
            })
            .collect()
    }
}

/// Shared verification manager type
pub type SharedVerificationManager = Arc<VerificationManager>;

pub fn create_shared_verification_manager(
    gateway: SharedGateway,
    clock: SharedClock,
    roles: RoleNames,
    kick_failure_policy: KickFailurePolicy,
) -> SharedVerificationManager {
    Arc::new(
        VerificationManager::new(gateway, clock, roles)
            .with_kick_failure_policy(kick_failure_policy),
    )
}
