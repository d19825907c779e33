use std::time::Duration;

use crate::error::Result;

use super::Context;

/// Reply with pong and the gateway latency.
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<()> {
    let latency = ctx.ping().await;
    ctx.say(pong_message(latency)).await?;
    Ok(())
}

fn pong_message(latency: Duration) -> String {
    format!("Pong! {}ms", latency.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_whole_milliseconds() {
        assert_eq!(pong_message(Duration::from_micros(42_700)), "Pong! 42ms");
    }
}
