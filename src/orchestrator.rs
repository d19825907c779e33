//! Provider selection, fallback and retry policy for a single prompt.

use log::{debug, info, warn};

use crate::config::Config;
use crate::providers::{GeminiClient, OllamaClient, OpenAiClient};

/// Chains the configured providers in preference order: Gemini (if
/// configured), `OpenAI`, then the local Ollama fallback (if enabled).
pub struct Orchestrator {
    primary: OpenAiClient,
    secondary: Option<GeminiClient>,
    local: Option<OllamaClient>,
}

impl Orchestrator {
    pub fn new(primary: OpenAiClient) -> Self {
        Self {
            primary,
            secondary: None,
            local: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut orchestrator = Self::new(OpenAiClient::new(config.openai_api_key.clone()));
        if let Some(key) = &config.google_api_key {
            orchestrator =
                orchestrator.with_secondary(GeminiClient::new(key.clone(), config.google_model.clone()));
        }
        if config.use_ollama {
            orchestrator =
                orchestrator.with_local_fallback(OllamaClient::new(config.ollama_model.clone()));
        }
        orchestrator
    }

    #[must_use]
    pub fn with_secondary(mut self, secondary: GeminiClient) -> Self {
        self.secondary = Some(secondary);
        self
    }

    #[must_use]
    pub fn with_local_fallback(mut self, local: OllamaClient) -> Self {
        self.local = Some(local);
        self
    }

    /// Produce the text to show the user for `prompt`.
    ///
    /// Always returns something displayable: either a model reply or the
    /// explanation of the last provider that was tried.
    pub async fn respond(&self, prompt: &str) -> String {
        if let Some(secondary) = &self.secondary {
            match secondary.generate(prompt).await {
                Ok(text) => {
                    debug!("Answered by Gemini");
                    return text;
                }
                Err(e) => warn!("Gemini call failed, falling back to OpenAI: {e}"),
            }
        }

        let primary = self.primary.complete(prompt).await;
        if primary.is_success() {
            debug!("Answered by OpenAI");
            return primary.text;
        }

        match &self.local {
            Some(local) if primary.outcome.warrants_fallback() => {
                info!(
                    "OpenAI failed with {} (status {}), attempting Ollama fallback",
                    primary.outcome,
                    primary.outcome.status_code()
                );
                // The fallback's own failure text is final
                local.generate(prompt).await.text
            }
            _ => {
                debug!("Returning OpenAI result with outcome {}", primary.outcome);
                primary.text
            }
        }
    }
}
