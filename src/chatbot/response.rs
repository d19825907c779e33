//! Response sending utilities for Discord.

use log::info;
use poise::serenity_prelude::{Context, Message as SerenityMessage};

use crate::error::Result;

/// Discord's per-message character limit.
pub const MESSAGE_LIMIT: usize = 2000;

/// Chunk size used once a reply exceeds [`MESSAGE_LIMIT`].
pub const CHUNK_SIZE: usize = 1990;

/// Split `text` into message-sized pieces on plain character boundaries.
pub fn split_reply(text: &str) -> Vec<&str> {
    if text.chars().count() <= MESSAGE_LIMIT {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(CHUNK_SIZE)
            .map_or(rest.len(), |(idx, _)| idx);
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Reply to `new_message` with `text`, one Discord reply per chunk, in order.
pub async fn send_reply(ctx: &Context, new_message: &SerenityMessage, text: &str) -> Result<()> {
    let chunks = split_reply(text);
    for chunk in &chunks {
        new_message.reply(&ctx.http, *chunk).await?;
    }

    info!(
        "Replied to {} in channel {} ({} message(s), {} chars)",
        new_message.author.tag(),
        new_message.channel_id,
        chunks.len(),
        text.chars().count()
    );
    Ok(())
}
