//! Process-wide pause switch and inbound message routing.

use std::sync::atomic::{AtomicBool, Ordering};

/// Prefixed forms of the resume command honoured while paused.
pub const RESUME_TOKENS: [&str; 2] = ["?start", "!start"];

/// Name of the command that resumes a paused bot.
pub const RESUME_COMMAND: &str = "start";

/// Whether the bot is answering messages.
///
/// Reads and writes are relaxed: a concurrent toggle only decides whether the
/// very next message is seen, never the handling of one already in flight.
#[derive(Debug)]
pub struct BotState {
    active: AtomicBool,
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}

impl BotState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Commands run while active. While paused only the resume command runs,
    /// and only when typed as a message starting with `?start` or `!start`;
    /// slash invocations (`prefix_content` of `None`) and mention-prefixed
    /// messages stay blocked, as [`route`] drops them.
    pub fn accepts_command(&self, name: &str, prefix_content: Option<&str>) -> bool {
        self.is_active()
            || (name == RESUME_COMMAND && prefix_content.is_some_and(is_resume_command))
    }

    /// Apply `toggle` on behalf of `caller`, leaving the flag untouched when denied.
    pub fn apply_toggle(&self, toggle: Toggle, caller: Caller) -> ToggleOutcome {
        if !caller.is_privileged() {
            return ToggleOutcome::Denied;
        }
        self.set_active(toggle.target_state());
        ToggleOutcome::Applied
    }
}

/// Pause or resume request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Stop,
    Start,
}

impl Toggle {
    fn target_state(self) -> bool {
        matches!(self, Toggle::Start)
    }

    pub fn confirmation(self) -> &'static str {
        match self {
            Toggle::Stop => "Bot paused. Use ?start to resume.",
            Toggle::Start => "Bot resumed. Ready to respond.",
        }
    }

    pub fn denial(self) -> String {
        let verb = match self {
            Toggle::Stop => "stop",
            Toggle::Start => "start",
        };
        format!("You don't have permission to {verb} the bot. (Owner or server admin required)")
    }
}

/// What the invoking user is allowed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    pub is_owner: bool,
    pub is_admin: bool,
}

impl Caller {
    /// Owner OR server administrator.
    pub fn is_privileged(self) -> bool {
        self.is_owner || self.is_admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied,
    Denied,
}

/// Routing decision for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Sent by a bot: no processing at all.
    Ignore,
    /// Paused and not a resume command: dropped silently.
    Drop,
    /// Handed to prefix-command dispatch only.
    Dispatch,
    /// Answered by the AI; command dispatch still runs afterwards.
    Converse,
}

pub fn route(author_is_bot: bool, active: bool, mentioned: bool, content: &str) -> Route {
    if author_is_bot {
        Route::Ignore
    } else if !active {
        if is_resume_command(content) {
            Route::Dispatch
        } else {
            Route::Drop
        }
    } else if mentioned {
        Route::Converse
    } else {
        Route::Dispatch
    }
}

pub fn is_resume_command(content: &str) -> bool {
    let content = content.trim();
    RESUME_TOKENS.iter().any(|token| content.starts_with(token))
}
