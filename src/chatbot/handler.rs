//! Main handler for bot mentions.

use log::{debug, error, info};
use poise::serenity_prelude::{Context, Message as SerenityMessage, UserId};

use crate::bot::Data;
use crate::error::Result;

use super::prompt::build_prompt;
use super::response::send_reply;

const APOLOGY: &str = "Sorry, I encountered an error while processing your request.";

/// Answer a message that mentions the bot.
///
/// Any failure while answering is turned into a single apology reply.
pub async fn handle_bot_mention(
    ctx: &Context,
    new_message: &SerenityMessage,
    data: &Data,
    bot_user_id: UserId,
) -> Result<()> {
    info!(
        "Received mention from {} in channel {}",
        new_message.author.tag(),
        new_message.channel_id
    );

    if let Err(e) = answer(ctx, new_message, data, bot_user_id).await {
        error!(
            "Error processing message from {}: {}",
            new_message.author.tag(),
            e
        );
        new_message.reply(&ctx.http, APOLOGY).await?;
    }

    Ok(())
}

async fn answer(
    ctx: &Context,
    new_message: &SerenityMessage,
    data: &Data,
    bot_user_id: UserId,
) -> Result<()> {
    // Typing stops when the guard is dropped
    let _typing = new_message.channel_id.start_typing(&ctx.http);

    let prompt = build_prompt(&new_message.content, bot_user_id);
    debug!("Prompt length: {} characters", prompt.chars().count());

    let reply = data.orchestrator().respond(&prompt).await;
    send_reply(ctx, new_message, &reply).await
}
