//! Pause and resume commands, restricted to owners and administrators.

use log::{info, warn};
use poise::CreateReply;

use crate::error::Result;
use crate::state::{Caller, Toggle, ToggleOutcome};

use super::Context;

/// Pause the bot so it ignores mentions and commands until `?start`.
#[poise::command(prefix_command, slash_command)]
pub async fn stop(ctx: Context<'_>) -> Result<()> {
    toggle(ctx, Toggle::Stop).await
}

/// Resume the bot after a pause.
#[poise::command(prefix_command, slash_command)]
pub async fn start(ctx: Context<'_>) -> Result<()> {
    toggle(ctx, Toggle::Start).await
}

async fn toggle(ctx: Context<'_>, toggle: Toggle) -> Result<()> {
    let caller = resolve_caller(ctx).await;

    match ctx.data().state().apply_toggle(toggle, caller) {
        ToggleOutcome::Applied => {
            info!("{:?} applied by {}", toggle, ctx.author().tag());
            ctx.say(toggle.confirmation()).await?;
        }
        ToggleOutcome::Denied => {
            warn!("{:?} denied for {}", toggle, ctx.author().tag());
            ctx.send(CreateReply::default().content(toggle.denial()).ephemeral(true))
                .await?;
        }
    }
    Ok(())
}

async fn resolve_caller(ctx: Context<'_>) -> Caller {
    let is_owner = ctx.framework().options().owners.contains(&ctx.author().id);

    // Resolve the member before touching the cache so no CacheRef is held across an await
    let member = ctx.author_member().await;
    let is_admin = member.is_some_and(|member| {
        ctx.guild()
            .is_some_and(|guild| guild.member_permissions(&member).administrator())
    });

    Caller { is_owner, is_admin }
}
