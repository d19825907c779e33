//! `test` command: a short-lived Bad/Ok/Good rating prompt.

use std::pin::pin;
use std::str::FromStr;
use std::time::Duration;

use futures::{Stream, StreamExt};
use log::{debug, warn};
use poise::CreateReply;
use poise::serenity_prelude::{
    ButtonStyle, Colour, ComponentInteraction, ComponentInteractionCollector,
    Context as SerenityContext, CreateActionRow, CreateButton, CreateEmbed,
    CreateInteractionResponse, CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
};
use strum::{Display, EnumString, VariantArray};

use crate::error::Result;

use super::Context;

const CUSTOM_ID_PREFIX: &str = "rating:";
const RATING_TIMEOUT: Duration = Duration::from_secs(60);
const DELETE_DELAY: Duration = Duration::from_secs(3);
const EMBED_COLOUR: Colour = Colour::new(0x2E_CC71);

/// One of the three mutually exclusive rating choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantArray)]
pub enum Rating {
    Bad,
    Ok,
    Good,
}

impl Rating {
    fn style(self) -> ButtonStyle {
        match self {
            Rating::Bad => ButtonStyle::Danger,
            Rating::Ok => ButtonStyle::Secondary,
            Rating::Good => ButtonStyle::Success,
        }
    }

    fn custom_id(self) -> String {
        format!("{CUSTOM_ID_PREFIX}{self}")
    }

    /// Parses a button custom id produced by this command.
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        custom_id
            .strip_prefix(CUSTOM_ID_PREFIX)
            .and_then(|label| Rating::from_str(label).ok())
    }

    fn button(self) -> CreateButton {
        CreateButton::new(self.custom_id())
            .label(self.to_string())
            .style(self.style())
    }

    fn acknowledgement(self) -> String {
        format!("You clicked: {self}")
    }
}

/// Ask for a Bad/Ok/Good rating; the message disappears shortly after a click.
#[poise::command(prefix_command, slash_command, rename = "test")]
pub async fn rate(ctx: Context<'_>) -> Result<()> {
    let embed = CreateEmbed::new()
        .title("Rate The bot")
        .description("Bad, Ok, or Good?")
        .colour(EMBED_COLOUR);
    let buttons = Rating::VARIANTS.iter().map(|rating| rating.button()).collect();

    let handle = ctx
        .send(
            CreateReply::default()
                .embed(embed)
                .components(vec![CreateActionRow::Buttons(buttons)]),
        )
        .await?;
    let message_id = handle.message().await?.id;

    let clicks = ComponentInteractionCollector::new(ctx.serenity_context())
        .message_id(message_id)
        .filter(|interaction| Rating::from_custom_id(&interaction.data.custom_id).is_some())
        .stream();

    let rated = answer_clicks(clicks, RATING_TIMEOUT, DELETE_DELAY, |interaction| async move {
        if let Some(rating) = Rating::from_custom_id(&interaction.data.custom_id) {
            acknowledge(ctx.serenity_context(), &interaction, rating).await;
        }
    })
    .await;

    if !rated {
        debug!("No rating received for message {message_id}");
        return Ok(());
    }

    if let Err(e) = handle.delete(ctx).await {
        warn!("Failed to delete rating message {message_id}: {e}");
    }
    Ok(())
}

/// Answers every click that arrives within `window`. The first click shortens
/// the remaining time to `linger`, so clicks landing before the message is
/// deleted are still answered. Returns whether any click arrived.
async fn answer_clicks<S, F, Fut>(
    clicks: S,
    window: Duration,
    linger: Duration,
    mut answer: F,
) -> bool
where
    S: Stream,
    F: FnMut(S::Item) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut clicks = pin!(clicks);
    let mut deadline = tokio::time::Instant::now() + window;
    let mut clicked = false;

    while let Ok(Some(click)) = tokio::time::timeout_at(deadline, clicks.next()).await {
        answer(click).await;
        if !clicked {
            clicked = true;
            deadline = tokio::time::Instant::now() + linger;
        }
    }
    clicked
}

/// Privately acknowledge the click. An interaction can be answered only once,
/// so a failed direct response falls back to defer + follow-up.
async fn acknowledge(ctx: &SerenityContext, interaction: &ComponentInteraction, rating: Rating) {
    let text = rating.acknowledgement();
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(&text)
            .ephemeral(true),
    );

    let Err(first) = interaction.create_response(ctx, response).await else {
        return;
    };
    debug!("Direct acknowledgement failed, deferring: {first}");

    if let Err(e) = interaction.defer_ephemeral(ctx).await {
        debug!("Defer failed (already acknowledged?): {e}");
    }

    let followup = CreateInteractionResponseFollowup::new()
        .content(text)
        .ephemeral(true);
    if let Err(second) = interaction.create_followup(ctx, followup).await {
        warn!("Failed to acknowledge interaction: {first} / {second}");
    }
}
