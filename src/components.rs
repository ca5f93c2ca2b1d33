//! Dispatch table for persistent message components.
//!
//! Buttons posted by the bot keep their custom id across restarts, so the
//! table is keyed by those fixed ids rather than by anything in memory.

use futures::future::BoxFuture;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use tracing::debug;

use crate::commands::verification::handle_verify_button;
use crate::{Data, Error};

/// Custom id of the "Verify" button on the verification prompt
pub const VERIFY_BUTTON_ID: &str = "verify_button";

pub type ComponentHandler = for<'a> fn(
    &'a serenity::Context,
    &'a serenity::ComponentInteraction,
    &'a Data,
) -> BoxFuture<'a, Result<(), Error>>;

pub struct ComponentRegistry {
    handlers: HashMap<&'static str, ComponentHandler>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with every component the bot posts
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(VERIFY_BUTTON_ID, verify_button);
        registry
    }

    pub fn register(&mut self, custom_id: &'static str, handler: ComponentHandler) {
        self.handlers.insert(custom_id, handler);
    }

    pub fn get(&self, custom_id: &str) -> Option<ComponentHandler> {
        self.handlers.get(custom_id).copied()
    }

    /// Route a component interaction to its handler.
    ///
    /// Returns `false` for ids nobody registered.
    pub async fn dispatch(
        &self,
        ctx: &serenity::Context,
        interaction: &serenity::ComponentInteraction,
        data: &Data,
    ) -> Result<bool, Error> {
        let custom_id = interaction.data.custom_id.as_str();
        let Some(handler) = self.get(custom_id) else {
            debug!("No handler for component '{}'", custom_id);
            return Ok(false);
        };
        handler(ctx, interaction, data).await?;
        Ok(true)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn verify_button<'a>(
    ctx: &'a serenity::Context,
    interaction: &'a serenity::ComponentInteraction,
    data: &'a Data,
) -> BoxFuture<'a, Result<(), Error>> {
    Box::pin(handle_verify_button(ctx, interaction, data))
}
