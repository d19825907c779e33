use std::env;

use log::{debug, error, info};

use crate::error::{BotError, Result};

const DEFAULT_GOOGLE_MODEL: &str = "gemini-pro";
const DEFAULT_OLLAMA_MODEL: &str = "mistral";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub openai_api_key: String,
    pub google_api_key: Option<String>,
    pub google_model: String,
    pub use_ollama: bool,
    pub ollama_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok())?;

        info!("Configuration loaded successfully");
        debug!(
            "Discord token length: {} characters",
            config.discord_token.len()
        );
        debug!(
            "OpenAI API key length: {} characters",
            config.openai_api_key.len()
        );
        match &config.google_api_key {
            Some(key) => debug!(
                "Gemini enabled (model {}, key length {} characters)",
                config.google_model,
                key.len()
            ),
            None => debug!("Gemini disabled: GOOGLE_API_KEY not set"),
        }
        debug!(
            "Ollama fallback: {} (model {})",
            if config.use_ollama { "enabled" } else { "disabled" },
            config.ollama_model
        );

        Ok(config)
    }

    /// Builds a config from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| {
            get(key).ok_or_else(|| {
                error!("Failed to load {key} from environment");
                BotError::MissingEnv(key)
            })
        };

        Ok(Self {
            discord_token: require("DISCORD_TOKEN")?,
            openai_api_key: require("OPENAI_API_KEY")?,
            google_api_key: get("GOOGLE_API_KEY"),
            google_model: get("GOOGLE_MODEL").unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.to_string()),
            use_ollama: get("USE_OLLAMA").is_some_and(|value| is_truthy(&value)),
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn required_only_uses_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DISCORD_TOKEN", "tok"), ("OPENAI_API_KEY", "sk")]))
                .expect("config should load");
        assert_eq!(config.discord_token, "tok");
        assert_eq!(config.openai_api_key, "sk");
        assert!(config.google_api_key.is_none());
        assert_eq!(config.google_model, "gemini-pro");
        assert!(!config.use_ollama);
        assert_eq!(config.ollama_model, "mistral");
    }

    #[test]
    fn missing_discord_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")])).unwrap_err();
        assert!(matches!(err, BotError::MissingEnv("DISCORD_TOKEN")));
    }

    #[test]
    fn blank_openai_key_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "tok"),
            ("OPENAI_API_KEY", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, BotError::MissingEnv("OPENAI_API_KEY")));
    }

    #[test]
    fn optional_overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "tok"),
            ("OPENAI_API_KEY", "sk"),
            ("GOOGLE_API_KEY", "g-key"),
            ("GOOGLE_MODEL", "gemini-1.5-flash"),
            ("USE_OLLAMA", "YES"),
            ("OLLAMA_MODEL", "llama3"),
        ]))
        .expect("config should load");
        assert_eq!(config.google_api_key.as_deref(), Some("g-key"));
        assert_eq!(config.google_model, "gemini-1.5-flash");
        assert!(config.use_ollama);
        assert_eq!(config.ollama_model, "llama3");
    }

    #[test]
    fn ollama_flag_accepts_only_truthy_values() {
        for (value, expected) in [("1", true), ("True", true), ("no", false), ("0", false)] {
            assert_eq!(is_truthy(value), expected, "value {value}");
        }
    }
}
