//! Discord bot that answers mentions with replies from a chain of AI providers.

pub mod bot;
pub mod chatbot;
pub mod commands;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod state;
pub mod types;

pub use bot::run;
