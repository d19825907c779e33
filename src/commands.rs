//! Prefix and slash commands: `ping`, `test`, `stop` and `start`.

mod ping;
mod rating;
mod toggle;

use crate::bot::Data;
use crate::error::BotError;

/// Context type for bot commands.
type Context<'a> = poise::Context<'a, Data, BotError>;

/// Get all bot commands.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<Data, BotError>> {
    vec![
        ping::ping(),
        rating::rate(),
        toggle::stop(),
        toggle::start(),
    ]
}
