//! AI chatbot module - answers messages that mention the bot.

mod handler;
mod prompt;
mod response;

pub use handler::handle_bot_mention;
