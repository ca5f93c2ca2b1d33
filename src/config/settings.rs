use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

use crate::error::{BotError, Result};

/// How often the reconciliation loop sweeps for expired verifications
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_RESTRICTED_ROLE: &str = "Unverified";
const DEFAULT_FULL_ACCESS_ROLE: &str = "Member";
const DEFAULT_KEEP_ALIVE_PORT: u16 = 8080;

/// Names of the two roles that make up the verification gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleNames {
    /// Assigned on join, removed on verification
    pub restricted: String,
    /// Granted on verification
    pub full_access: String,
}

impl Default for RoleNames {
    fn default() -> Self {
        Self {
            restricted: DEFAULT_RESTRICTED_ROLE.to_string(),
            full_access: DEFAULT_FULL_ACCESS_ROLE.to_string(),
        }
    }
}

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    pub roles: RoleNames,
    /// Port for the keep-alive HTTP endpoint, `None` when disabled
    pub keep_alive_port: Option<u16>,
    pub log_level: LevelFilter,
}

impl Settings {
    /// Create settings from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BotError::Config {
                message: "DISCORD_TOKEN is not set. Create a .env file with your bot token."
                    .to_string(),
            })?;

        let roles = RoleNames {
            restricted: role_name(&lookup, "RESTRICTED_ROLE", DEFAULT_RESTRICTED_ROLE)?,
            full_access: role_name(&lookup, "FULL_ACCESS_ROLE", DEFAULT_FULL_ACCESS_ROLE)?,
        };
        if roles.restricted == roles.full_access {
            return Err(BotError::Config {
                message: format!(
                    "RESTRICTED_ROLE and FULL_ACCESS_ROLE must differ (both are '{}')",
                    roles.restricted
                ),
            });
        }

        let keep_alive_port = match lookup("KEEP_ALIVE_PORT") {
            None => Some(DEFAULT_KEEP_ALIVE_PORT),
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(0) => None,
                Ok(port) => Some(port),
                Err(_) => {
                    return Err(BotError::Config {
                        message: format!("KEEP_ALIVE_PORT is not a valid port: '{}'", raw),
                    })
                }
            },
        };

        let log_level = match lookup("LOG_LEVEL") {
            None => LevelFilter::INFO,
            Some(raw) => raw.trim().parse().map_err(|_| BotError::Config {
                message: format!("LOG_LEVEL is not a valid level: '{}'", raw),
            })?,
        };

        Ok(Self {
            token,
            roles,
            keep_alive_port,
            log_level,
        })
    }
}

fn role_name(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<String> {
    match lookup(key) {
        None => Ok(default.to_string()),
        Some(raw) if raw.trim().is_empty() => Err(BotError::Config {
            message: format!("{} must not be empty", key),
        }),
        Some(raw) => Ok(raw.trim().to_string()),
    }
}
