//! Discord bot core logic and event handling.

use log::{debug, error, info, warn};
use poise::{
    Framework, FrameworkError, FrameworkOptions, PrefixFrameworkOptions, builtins,
    serenity_prelude::{ClientBuilder, Context, FullEvent, GatewayIntents, Message},
};

use crate::chatbot::handle_bot_mention;
use crate::commands::all_commands;
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::orchestrator::Orchestrator;
use crate::state::{BotState, Route, route};

const PRIMARY_PREFIX: &str = "!";
const SECONDARY_PREFIX: &str = "?";
const LOG_PREVIEW_CHARS: usize = 200;

/// Shared data available to every handler and command.
pub struct Data {
    orchestrator: Orchestrator,
    state: BotState,
}

impl Data {
    pub fn new(orchestrator: Orchestrator, state: BotState) -> Self {
        Self {
            orchestrator,
            state,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }
}

/// Run the Discord bot.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    debug!("Initializing AI providers");
    let orchestrator = Orchestrator::from_config(&config);

    debug!("Setting up gateway intents");
    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    debug!("Building framework");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: all_commands(),
            prefix_options: PrefixFrameworkOptions {
                prefix: Some(PRIMARY_PREFIX.to_string()),
                additional_prefixes: vec![poise::Prefix::Literal(SECONDARY_PREFIX)],
                mention_as_prefix: true,
                ..Default::default()
            },
            command_check: Some(|ctx| {
                Box::pin(async move {
                    let prefix_content = match ctx {
                        poise::Context::Prefix(prefix) => Some(prefix.msg.content.as_str()),
                        poise::Context::Application(_) => None,
                    };
                    Ok(ctx
                        .data()
                        .state()
                        .accepts_command(&ctx.command().name, prefix_content))
                })
            }),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, _framework, data| Box::pin(event_handler(ctx, event, data)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot is ready and connected to Discord as {}", ready.user.name);
                debug!("Registering commands globally");
                builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully");
                Ok(Data::new(orchestrator, BotState::new()))
            })
        })
        .build();

    debug!("Creating Discord client");
    let mut client = ClientBuilder::new(config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    Ok(())
}

fn log_incoming(message: &Message) {
    let preview = if message.content.is_empty() {
        "<no content>".to_string()
    } else {
        message.content.chars().take(LOG_PREVIEW_CHARS).collect()
    };
    info!(
        "Incoming message from {} in channel {}: {}",
        message.author.tag(),
        message.channel_id,
        preview
    );
}

async fn event_handler(ctx: &Context, event: &FullEvent, data: &Data) -> Result<()> {
    if let FullEvent::Message { new_message } = event {
        log_incoming(new_message);

        let bot_user_id = ctx.cache.current_user().id;
        let decision = route(
            new_message.author.bot,
            data.state().is_active(),
            new_message.mentions_user_id(bot_user_id),
            &new_message.content,
        );
        debug!("Message {} routed as {:?}", new_message.id, decision);

        // The framework has already run any prefix command in this message,
        // gated by command_check; only the AI reply is left to do here
        if decision == Route::Converse {
            handle_bot_mention(ctx, new_message, data, bot_user_id).await?;
        }
    }
    Ok(())
}

async fn on_error(error: FrameworkError<'_, Data, BotError>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!("Command '{}' failed: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(error.user_message()).await {
                warn!("Failed to report command error: {e}");
            }
        }
        FrameworkError::CommandCheckFailed { ctx, .. } => {
            debug!("Ignoring '{}' while paused", ctx.command().name);
        }
        FrameworkError::UnknownCommand { .. } => {}
        other => {
            if let Err(e) = builtins::on_error(other).await {
                error!("Error while handling framework error: {e}");
            }
        }
    }
}
