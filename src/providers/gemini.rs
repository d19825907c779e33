use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");
        (!text.is_empty()).then_some(text)
    }
}

/// Client for the optional secondary provider.
///
/// The HTTP call is synchronous and always runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn generate_url(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Generate a reply for `prompt` on a blocking worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, an
    /// unparsable or empty response, or if the worker task dies.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.generate_url();
        let api_key = self.api_key.clone();
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        debug!("Dispatching Gemini request for model {}", self.model);
        tokio::task::spawn_blocking(move || generate_blocking(&url, &api_key, &request)).await?
    }
}

fn generate_blocking(url: &str, api_key: &str, request: &GenerateContentRequest) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let response = client
        .post(url)
        .query(&[("key", api_key)])
        .json(request)
        .send()?;

    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(BotError::GeminiApi {
            status,
            message: body,
        });
    }

    let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
    parsed
        .into_text()
        .ok_or_else(|| BotError::GeminiResponse("No text in response candidates".to_string()))
}
