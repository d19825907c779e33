//! Prompt extraction from a mention message.

use poise::serenity_prelude::UserId;

/// Sent to the model when the mention carries no text of its own.
pub const DEFAULT_PROMPT: &str = "Hello! Say something nice.";

/// Strips the bot's mention tokens (`<@id>` and the nickname form `<@!id>`)
/// and surrounding whitespace from `content`.
pub fn build_prompt(content: &str, bot_user_id: UserId) -> String {
    let id = bot_user_id.get();
    let stripped = content
        .replace(&format!("<@{id}>"), "")
        .replace(&format!("<@!{id}>"), "");

    match stripped.trim() {
        "" => DEFAULT_PROMPT.to_string(),
        prompt => prompt.to_string(),
    }
}
