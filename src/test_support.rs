//! In-memory gateway and clock for exercising the verification lifecycle
//! without Discord.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::clock::Clock;
use crate::error::{BotError, Result};
use crate::gateway::MembershipGateway;

pub const GUILD: GuildId = GuildId::new(7);
pub const RESTRICTED: &str = "Unverified";
pub const FULL_ACCESS: &str = "Member";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    FindRole,
    MemberRoles,
    AddRole,
    RemoveRole,
    Kick,
}

/// Whether a suspension happens before or after the call takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Permission,
    NotFound,
    Unavailable,
}

impl FailureKind {
    fn to_error(self, op: GatewayOp) -> BotError {
        match self {
            FailureKind::Permission => BotError::PermissionDenied {
                message: format!("{:?}: Missing Permissions", op),
            },
            FailureKind::NotFound => BotError::NotFound {
                message: format!("{:?}: Unknown Member", op),
            },
            FailureKind::Unavailable => BotError::Discord {
                message: format!("{:?}: 503 Service Unavailable", op),
            },
        }
    }
}

/// Mutating calls, in the order they were issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    AddRole(UserId, RoleId),
    RemoveRole(UserId, RoleId),
    Kick(UserId),
}

/// Handles for a task parked inside a gateway call
#[derive(Clone)]
pub struct Suspension {
    pub reached: Arc<Notify>,
    pub resume: Arc<Notify>,
}

struct Failure {
    kind: FailureKind,
    persistent: bool,
}

#[derive(Default)]
pub struct FakeGateway {
    roles: Mutex<HashMap<(GuildId, String), RoleId>>,
    members: Mutex<HashMap<(GuildId, UserId), HashSet<RoleId>>>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Mutex<HashMap<GatewayOp, Failure>>,
    suspensions: Mutex<HashMap<(GatewayOp, Stage), Suspension>>,
    next_role: Mutex<u64>,
}

impl FakeGateway {
    /// A guild with both the restricted and full-access roles
    pub fn with_default_roles() -> Arc<Self> {
        let gateway = Self::default();
        gateway.create_role(GUILD, RESTRICTED);
        gateway.create_role(GUILD, FULL_ACCESS);
        Arc::new(gateway)
    }

    pub fn create_role(&self, guild_id: GuildId, name: &str) -> RoleId {
        let mut next = self.next_role.lock();
        *next += 1;
        let role_id = RoleId::new(100 + *next);
        self.roles.lock().insert((guild_id, name.to_string()), role_id);
        role_id
    }

    pub fn role(&self, guild_id: GuildId, name: &str) -> RoleId {
        self.roles
            .lock()
            .get(&(guild_id, name.to_string()))
            .copied()
            .expect("role not created")
    }

    pub fn add_member(&self, guild_id: GuildId, user_id: UserId) {
        self.members.lock().entry((guild_id, user_id)).or_default();
    }

    pub fn remove_member(&self, guild_id: GuildId, user_id: UserId) {
        self.members.lock().remove(&(guild_id, user_id));
    }

    pub fn grant(&self, guild_id: GuildId, user_id: UserId, name: &str) {
        let role_id = self.role(guild_id, name);
        self.members
            .lock()
            .entry((guild_id, user_id))
            .or_default()
            .insert(role_id);
    }

    pub fn holds(&self, guild_id: GuildId, user_id: UserId, name: &str) -> bool {
        let role_id = self.role(guild_id, name);
        self.members
            .lock()
            .get(&(guild_id, user_id))
            .map(|roles| roles.contains(&role_id))
            .unwrap_or(false)
    }

    pub fn is_member(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.members.lock().contains_key(&(guild_id, user_id))
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn kick_count(&self, user_id: UserId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == GatewayCall::Kick(user_id))
            .count()
    }

    /// Fail the next call of `op` only
    pub fn fail_once(&self, op: GatewayOp, kind: FailureKind) {
        self.failures.lock().insert(
            op,
            Failure {
                kind,
                persistent: false,
            },
        );
    }

    /// Fail every call of `op` until cleared
    pub fn fail_always(&self, op: GatewayOp, kind: FailureKind) {
        self.failures.lock().insert(
            op,
            Failure {
                kind,
                persistent: true,
            },
        );
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Park the next call of `op` at `stage` until `resume` is notified
    pub fn suspend(&self, op: GatewayOp, stage: Stage) -> Suspension {
        let suspension = Suspension {
            reached: Arc::new(Notify::new()),
            resume: Arc::new(Notify::new()),
        };
        self.suspensions
            .lock()
            .insert((op, stage), suspension.clone());
        suspension
    }

    async fn checkpoint(&self, op: GatewayOp, stage: Stage) {
        let suspension = self.suspensions.lock().remove(&(op, stage));
        if let Some(s) = suspension {
            s.reached.notify_one();
            s.resume.notified().await;
        }
    }

    fn injected_failure(&self, op: GatewayOp) -> Option<BotError> {
        let mut failures = self.failures.lock();
        let failure = failures.get(&op)?;
        let err = failure.kind.to_error(op);
        if !failure.persistent {
            failures.remove(&op);
        }
        Some(err)
    }

    fn unknown_member(guild_id: GuildId, user_id: UserId) -> BotError {
        BotError::NotFound {
            message: format!("member {} not in guild {}", user_id, guild_id),
        }
    }

    async fn mutate_roles(
        &self,
        op: GatewayOp,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<()> {
        self.checkpoint(op, Stage::Before).await;
        if let Some(err) = self.injected_failure(op) {
            return Err(err);
        }
        {
            let mut members = self.members.lock();
            let roles = members
                .get_mut(&(guild_id, user_id))
                .ok_or_else(|| Self::unknown_member(guild_id, user_id))?;
            if op == GatewayOp::AddRole {
                roles.insert(role_id);
                self.calls.lock().push(GatewayCall::AddRole(user_id, role_id));
            } else {
                roles.remove(&role_id);
                self.calls
                    .lock()
                    .push(GatewayCall::RemoveRole(user_id, role_id));
            }
        }
        self.checkpoint(op, Stage::After).await;
        Ok(())
    }
}

#[async_trait]
impl MembershipGateway for FakeGateway {
    async fn find_role(&self, guild_id: GuildId, name: &str) -> Result<Option<RoleId>> {
        if let Some(err) = self.injected_failure(GatewayOp::FindRole) {
            return Err(err);
        }
        Ok(self.roles.lock().get(&(guild_id, name.to_string())).copied())
    }

    async fn member_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<Vec<RoleId>>> {
        self.checkpoint(GatewayOp::MemberRoles, Stage::Before).await;
        if let Some(err) = self.injected_failure(GatewayOp::MemberRoles) {
            return Err(err);
        }
        let roles = self
            .members
            .lock()
            .get(&(guild_id, user_id))
            .map(|roles| roles.iter().copied().collect());
        Ok(roles)
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> Result<()> {
        self.mutate_roles(GatewayOp::AddRole, guild_id, user_id, role_id)
            .await
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> Result<()> {
        self.mutate_roles(GatewayOp::RemoveRole, guild_id, user_id, role_id)
            .await
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, _reason: &str) -> Result<()> {
        self.checkpoint(GatewayOp::Kick, Stage::Before).await;
        if let Some(err) = self.injected_failure(GatewayOp::Kick) {
            self.calls.lock().push(GatewayCall::Kick(user_id));
            return Err(err);
        }
        if self.members.lock().remove(&(guild_id, user_id)).is_none() {
            return Err(Self::unknown_member(guild_id, user_id));
        }
        self.calls.lock().push(GatewayCall::Kick(user_id));
        self.checkpoint(GatewayOp::Kick, Stage::After).await;
        Ok(())
    }
}
