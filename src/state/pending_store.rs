//! In-memory store of members awaiting verification.
//!
//! Not persisted: a restart forgets every pending deadline.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};

/// Hours a restricted member has to verify before enforcement
pub const GRACE_PERIOD_HOURS: i64 = 24;

pub fn grace_period() -> Duration {
    Duration::hours(GRACE_PERIOD_HOURS)
}

/// A restricted member awaiting verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub join_time: DateTime<Utc>,
    /// Always `join_time + grace_period()`, fixed at creation
    pub deadline: DateTime<Utc>,
    /// Snapshot taken at join, used for reporting only
    pub display_name: String,
}

impl PendingVerification {
    fn new(guild_id: GuildId, user_id: UserId, display_name: &str, join_time: DateTime<Utc>) -> Self {
        Self {
            user_id,
            guild_id,
            join_time,
            deadline: join_time + grace_period(),
            display_name: display_name.to_string(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline <= now
    }

    /// Time left until the deadline, zero once it has passed
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline - now).max(Duration::zero())
    }
}

/// Pending verifications keyed by (guild, member).
///
/// Each operation is atomic on its own; nothing here spans an await.
#[derive(Debug, Default)]
pub struct PendingStore {
    entries: DashMap<(GuildId, UserId), PendingVerification>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member unless they are already pending.
    ///
    /// Returns `false` and leaves the existing deadline untouched for a
    /// duplicate.
    pub fn upsert_if_absent(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        display_name: &str,
        join_time: DateTime<Utc>,
    ) -> bool {
        match self.entries.entry((guild_id, user_id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PendingVerification::new(
                    guild_id,
                    user_id,
                    display_name,
                    join_time,
                ));
                true
            }
        }
    }

    /// Remove a member's record. Removing an absent record is a no-op.
    pub fn remove(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.entries.remove(&(guild_id, user_id)).is_some()
    }

    /// Remove the record only if it is still the one that was read.
    ///
    /// Used by the sweep so a record re-created after the read survives.
    pub fn remove_matching(&self, record: &PendingVerification) -> bool {
        self.entries
            .remove_if(&(record.guild_id, record.user_id), |_, current| {
                current.deadline == record.deadline
            })
            .is_some()
    }

    pub fn get(&self, guild_id: GuildId, user_id: UserId) -> Option<PendingVerification> {
        self.entries.get(&(guild_id, user_id)).map(|r| r.clone())
    }

    /// All records whose deadline is at or before `now`
    pub fn list_expired(&self, now: DateTime<Utc>) -> Vec<PendingVerification> {
        self.entries
            .iter()
            .filter(|r| r.is_expired(now))
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn list_all(&self) -> Vec<PendingVerification> {
        self.entries.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
