use std::time::Duration;

use log::{debug, error, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::types::ChatMessage;

use super::{Outcome, ProviderReply, RetryPolicy};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-3.5-turbo";
const SYSTEM_PROMPT: &str = "You are a helpful Discord bot assistant. Keep responses concise and \
    friendly. Respond in a natural conversational way.";

// Discord caps messages at 2000 characters; 500 tokens keeps most replies in one message
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for the primary chat-completion provider.
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            endpoint: OPENAI_API_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
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

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Ask the model to answer `prompt`, retrying rate limits, 5xx and timeouts.
    ///
    /// Never fails: every error is folded into the returned [`ProviderReply`].
    pub async fn complete(&self, prompt: &str) -> ProviderReply {
        let request = ChatCompletionRequest {
            model: MODEL,
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let mut retry = 0;
        loop {
            let reply = self.attempt(&request).await;
            if !reply.outcome.is_retryable() || retry >= self.retry.max_retries {
                return reply;
            }

            let delay = self.retry.delay_for(retry);
            warn!(
                "OpenAI attempt {} failed ({}), retrying in {:?}",
                retry + 1,
                reply.outcome,
                delay
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    async fn attempt(&self, request: &ChatCompletionRequest<'_>) -> ProviderReply {
        debug!("Sending request to OpenAI API");

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(&e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return transport_failure(&e),
            Err(e) => format!("<failed to read body: {e}>"),
        };

        if status == StatusCode::OK {
            return parse_completion(&body);
        }

        error!("OpenAI API error (status={status}): {body}");
        let outcome = Outcome::from_status(status);
        let text = match outcome {
            Outcome::AuthFailure => {
                "AI authentication failed (invalid API key). The bot owner should check the \
                 OPENAI_API_KEY environment variable."
            }
            Outcome::RateLimited => {
                "I'm being rate-limited by the AI service. Try again in a moment."
            }
            Outcome::ServerError(_) => "AI service is currently unavailable. Try again later.",
            _ => {
                "I'm having trouble connecting to my AI brain right now. Try again in a moment!"
            }
        };
        ProviderReply::new(text, outcome)
    }
}

fn parse_completion(body: &str) -> ProviderReply {
    let content = serde_json::from_str::<ChatCompletionResponse>(body)
        .map_err(|e| e.to_string())
        .and_then(|response| {
            response
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| "no choices in response".to_string())
        });

    match content {
        Ok(content) => {
            debug!("Received response from OpenAI API");
            ProviderReply::success(content.trim())
        }
        Err(e) => {
            error!("Failed to parse OpenAI response: {e}; body: {body}");
            ProviderReply::new(
                "AI returned an unexpected response format. Try again later.",
                Outcome::MalformedResponse,
            )
        }
    }
}

fn transport_failure(err: &reqwest::Error) -> ProviderReply {
    let outcome = Outcome::from_transport_error(err);
    let text = if outcome == Outcome::Timeout {
        warn!("Timeout contacting OpenAI: {err}");
        "The request timed out. Please try again!".to_string()
    } else if err.is_connect() {
        error!("Network/connection error contacting OpenAI: {err}");
        "Network error contacting AI service. Please check the host machine's internet \
         connection."
            .to_string()
    } else {
        error!("Error calling OpenAI API: {err}");
        format!("An error occurred: {err}")
    };
    ProviderReply::new(text, outcome)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const PATH: &str = "/v1/chat/completions";

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        }
    }

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new("sk-test".to_string())
            .with_endpoint(format!("{}{PATH}", server.uri()))
            .with_retry_policy(fast_retries())
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[tokio::test]
    async fn success_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": "say hi"}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": [{"message": {"content": "hi"}}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("say hi").await;

        assert_eq!(reply, ProviderReply::success("hi"));
    }

    #[tokio::test]
    async fn content_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  hello there \n")))
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply.text, "hello there");
        assert!(reply.is_success());
    }

    #[tokio::test]
    async fn rate_limit_retries_twice_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply.outcome, Outcome::RateLimited);
        assert_eq!(
            reply.text,
            "I'm being rate-limited by the AI service. Try again in a moment."
        );
    }

    #[tokio::test]
    async fn retries_wait_with_doubling_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;
        let client = client_for(&server).with_retry_policy(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(40),
        });

        let started = Instant::now();
        client.complete("hey").await;

        // 40ms + 80ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply.outcome, Outcome::AuthFailure);
        assert!(reply.text.contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn server_error_recovers_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("back up")))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply, ProviderReply::success("back up"));
    }

    #[tokio::test]
    async fn persistent_server_error_keeps_last_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply.outcome, Outcome::ServerError(502));
        assert_eq!(
            reply.text,
            "AI service is currently unavailable. Try again later."
        );
    }

    #[tokio::test]
    async fn client_error_is_returned_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply.outcome, Outcome::UnexpectedStatus(400));
    }

    #[tokio::test]
    async fn unparsable_success_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply.outcome, Outcome::MalformedResponse);
        assert_eq!(
            reply.text,
            "AI returned an unexpected response format. Try again later."
        );
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hey").await;

        assert_eq!(reply.outcome, Outcome::MalformedResponse);
    }

    #[tokio::test]
    async fn slow_responses_time_out_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("too late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        let client = client_for(&server).with_timeout(Duration::from_millis(50));

        let reply = client.complete("hey").await;

        assert_eq!(reply.outcome, Outcome::Timeout);
        assert_eq!(reply.text, "The request timed out. Please try again!");
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        // Bind then drop a listener to get a local port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenAiClient::new("sk-test".to_string())
            .with_endpoint(format!("http://{addr}{PATH}"))
            .with_retry_policy(fast_retries());

        let reply = client.complete("hey").await;

        assert_eq!(reply.outcome, Outcome::NetworkError);
        assert!(reply.text.starts_with("Network error contacting AI service"));
    }
}
