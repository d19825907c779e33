use std::time::Duration;

use log::{debug, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{Outcome, ProviderReply};

const OLLAMA_API_URL: &str = "http://localhost:11434/api/generate";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    text: Option<String>,
}

/// Client for a local Ollama instance used as the last-resort fallback.
pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            model,
            endpoint: OLLAMA_API_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate a non-streamed completion for `prompt`.
    pub async fn generate(&self, prompt: &str) -> ProviderReply {
        debug!("Sending request to Ollama with model {}", self.model);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let result = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(e) => return unreachable_reply(&e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return unreachable_reply(&e),
        };

        if status != StatusCode::OK {
            warn!("Ollama error (status={status}): {body}");
            return ProviderReply::new(
                format!("Ollama fallback failed (status={})", status.as_u16()),
                Outcome::from_status(status),
            );
        }

        ProviderReply::success(extract_text(body))
    }
}

/// Prefers `response`, then `text`, then the raw body.
fn extract_text(body: String) -> String {
    serde_json::from_str::<GenerateResponse>(&body)
        .ok()
        .and_then(|parsed| {
            parsed
                .response
                .filter(|text| !text.is_empty())
                .or(parsed.text.filter(|text| !text.is_empty()))
        })
        .unwrap_or(body)
}

fn unreachable_reply(err: &reqwest::Error) -> ProviderReply {
    warn!("Error contacting Ollama: {err}");
    ProviderReply::new(
        format!("Error contacting local Ollama: {err}"),
        Outcome::from_transport_error(err),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new("mistral".to_string())
            .with_endpoint(format!("{}/api/generate", server.uri()))
    }

    #[test]
    fn text_field_preference() {
        assert_eq!(
            extract_text(r#"{"response":"a","text":"b"}"#.to_string()),
            "a"
        );
        assert_eq!(extract_text(r#"{"response":"","text":"b"}"#.to_string()), "b");
        assert_eq!(extract_text(r#"{"done":true}"#.to_string()), r#"{"done":true}"#);
        assert_eq!(extract_text("plain words".to_string()), "plain words");
    }

    #[tokio::test]
    async fn sends_non_streaming_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(
                json!({"model": "mistral", "prompt": "hi", "stream": false}),
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": "local hello"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).generate("hi").await;

        assert_eq!(reply, ProviderReply::success("local hello"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let reply = client_for(&server).generate("hi").await;

        assert_eq!(reply.text, "Ollama fallback failed (status=404)");
        assert_eq!(reply.outcome, Outcome::UnexpectedStatus(404));
    }

    #[tokio::test]
    async fn unreachable_service_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let reply = OllamaClient::new("mistral".to_string())
            .with_endpoint(format!("http://{addr}/api/generate"))
            .generate("hi")
            .await;

        assert_eq!(reply.outcome, Outcome::NetworkError);
        assert!(reply.text.starts_with("Error contacting local Ollama:"));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "too late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .with_timeout(Duration::from_millis(50))
            .generate("hi")
            .await;

        assert_eq!(reply.outcome, Outcome::Timeout);
        assert!(reply.text.starts_with("Error contacting local Ollama:"));
    }
}
