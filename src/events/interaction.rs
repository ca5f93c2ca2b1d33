use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::{Data, Error};

/// Route component interactions (button clicks) through the dispatch table.
/// Slash commands are handled by the framework.
pub async fn handle_component_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    let serenity::Interaction::Component(component) = interaction else {
        return Ok(());
    };

    debug!(
        "Component '{}' clicked by {}",
        component.data.custom_id, component.user.name
    );
    data.components.dispatch(ctx, component, data).await?;
    Ok(())
}
