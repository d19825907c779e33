//! AI text-generation providers and their shared result contract.

mod gemini;
mod ollama;
mod openai;

use std::time::Duration;

use reqwest::StatusCode;
use strum::Display;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Classification of a provider call, used to drive retry and fallback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Success,
    AuthFailure,
    RateLimited,
    ServerError(u16),
    Timeout,
    NetworkError,
    MalformedResponse,
    /// Any other non-success status (400, 403, 404, ...).
    UnexpectedStatus(u16),
}

impl Outcome {
    /// Classifies an HTTP status code.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => Outcome::Success,
            StatusCode::UNAUTHORIZED => Outcome::AuthFailure,
            StatusCode::TOO_MANY_REQUESTS => Outcome::RateLimited,
            status if status.is_server_error() => Outcome::ServerError(status.as_u16()),
            status => Outcome::UnexpectedStatus(status.as_u16()),
        }
    }

    /// Classifies a transport-level failure (no response received).
    #[must_use]
    pub fn from_transport_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Outcome::Timeout
        } else {
            Outcome::NetworkError
        }
    }

    /// Transient failures that are worth another attempt against the same provider.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Outcome::RateLimited | Outcome::ServerError(_) | Outcome::Timeout
        )
    }

    /// Failures that hand the prompt over to the local fallback model.
    ///
    /// Timeouts and network errors are reported with 504/503 statuses, so they
    /// belong to the server-error class here.
    #[must_use]
    pub fn warrants_fallback(self) -> bool {
        matches!(
            self,
            Outcome::AuthFailure
                | Outcome::RateLimited
                | Outcome::ServerError(_)
                | Outcome::Timeout
                | Outcome::NetworkError
        )
    }

    /// HTTP-style status code for logging.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Outcome::Success | Outcome::MalformedResponse => 200,
            Outcome::AuthFailure => 401,
            Outcome::RateLimited => 429,
            Outcome::Timeout => 504,
            Outcome::NetworkError => 503,
            Outcome::ServerError(code) | Outcome::UnexpectedStatus(code) => code,
        }
    }
}

/// Text produced by a provider call together with its outcome.
///
/// On failure `text` holds a user-facing explanation rather than a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub text: String,
    pub outcome: Outcome,
}

impl ProviderReply {
    pub fn new(text: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            text: text.into(),
            outcome,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, Outcome::Success)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Exponential backoff schedule for retryable outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based): base, 2x base, 4x base...
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }
}
