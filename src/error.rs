use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Role not found: {name}")]
    RoleNotFound { name: String },

    // Discord errors
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Restricted role was removed but the full-access role could not be granted: {source}")]
    RoleSwapIncomplete {
        #[source]
        source: Box<BotError>,
    },

    #[error("Discord API error: {message}")]
    Discord { message: String },
}

impl BotError {
    /// A required role is missing from the guild; nothing was changed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, BotError::RoleNotFound { .. })
    }

    /// The gateway refused the mutation.
    pub fn is_permission(&self) -> bool {
        match self {
            BotError::PermissionDenied { .. } => true,
            BotError::RoleSwapIncomplete { source } => source.is_permission(),
            _ => false,
        }
    }

    /// The member (or the object being acted on) no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BotError::NotFound { .. })
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        if let serenity::Error::Http(http_err) = &err {
            match http_err.status_code().map(|s| s.as_u16()) {
                Some(403) => {
                    return BotError::PermissionDenied {
                        message: err.to_string(),
                    }
                }
                Some(404) => {
                    return BotError::NotFound {
                        message: err.to_string(),
                    }
                }
                _ => {}
            }
        }
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;
