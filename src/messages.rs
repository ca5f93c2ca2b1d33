// src/messages.rs

use poise::serenity_prelude as serenity;

/// Embed colour matching Discord's dark theme background
pub const PROMPT_COLOR: u32 = 0x2b2d31;
pub const WARNING_COLOR: u32 = 0xe74c3c;

pub fn verification_prompt_embed(icon_url: Option<String>) -> serenity::CreateEmbed {
    let embed = serenity::CreateEmbed::new()
        .title("Verification Required")
        .description(
            "To access the server, please verify your account by clicking the button below.\n\n\
            *Unverified members are automatically removed after 24 hours.*",
        )
        .footer(serenity::CreateEmbedFooter::new("Secure Verification"))
        .timestamp(serenity::Timestamp::now())
        .color(PROMPT_COLOR);

    match icon_url {
        Some(url) => embed.thumbnail(url),
        None => embed,
    }
}

pub fn verified_embed(mention: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(format!(
            "# Welcome to the Community\n{}, you have been successfully verified.",
            mention
        ))
        .color(PROMPT_COLOR)
}

pub fn configuration_error() -> String {
    "❌ System configuration error. Please contact a server administrator.".to_string()
}

pub fn already_verified() -> String {
    "✨ You are already verified and have full access.".to_string()
}

pub fn verification_failed(error: &str) -> String {
    format!("❌ Verification failed: {}", error)
}

pub fn guild_only() -> String {
    "❌ Verification only works inside a server.".to_string()
}

pub fn kicks_in(hours: i64, minutes: i64) -> String {
    format!("Kicks in: {}h {}m", hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kicks_in_format() {
        assert_eq!(kicks_in(23, 5), "Kicks in: 23h 5m");
        assert_eq!(kicks_in(0, 0), "Kicks in: 0h 0m");
    }

    #[test]
    fn test_failure_message_carries_error() {
        let msg = verification_failed("Permission denied: Missing Permissions");
        assert!(msg.contains("Missing Permissions"));
    }
}
