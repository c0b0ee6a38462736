use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{ChatMessage, ChatModel};
use crate::config::LlmConfig;
use crate::error::{Result, MovieragError};

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Failed attempt; `retryable` marks 429 and 5xx responses.
struct AttemptError {
    retryable: bool,
    error: MovieragError,
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn first_choice(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| MovieragError::Llm("Empty choices in chat completion response".to_string()))
}

/// OpenAI-compatible chat completions client
///
/// Sends each prompt once by default. With `max_retries > 0`, rate-limit and
/// server errors are retried with exponential backoff.
pub struct OpenAIChatModel {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: Option<f32>,
    max_retries: usize,
}

impl OpenAIChatModel {
    /// Create a new chat model client
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o-mini")
    /// * `base_url` - API root, e.g. "https://api.openai.com/v1"
    /// * `request_timeout` - Transport-level timeout per HTTP request
    pub fn new(
        api_key: String,
        model: String,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| MovieragError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            temperature: None,
            max_retries: 0,
        })
    }

    /// Build a client from the `[llm]` config section, reading the key from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            MovieragError::Config(format!("Environment variable {} not set", config.api_key_env))
        })?;
        let mut model = Self::new(
            api_key,
            config.model.clone(),
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        model.temperature = config.temperature;
        model.max_retries = config.max_retries;
        Ok(model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Make a single API request
    async fn send_once(&self, messages: &[ChatMessage]) -> std::result::Result<String, AttemptError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AttemptError {
                retryable: e.is_timeout() || e.is_connect(),
                error: MovieragError::Llm(format!("Network error: {}", e)),
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(AttemptError {
                retryable: is_retryable(status),
                error: MovieragError::Llm(format!("OpenAI API error {}: {}", status, body)),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| AttemptError {
            retryable: false,
            error: MovieragError::Llm(format!("Failed to parse response: {}", e)),
        })?;

        first_choice(parsed).map_err(|error| AttemptError { retryable: false, error })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            match self.send_once(messages).await {
                Ok(text) => {
                    log::debug!(
                        "Chat completion took {:?} (attempt {})",
                        start.elapsed(),
                        attempt + 1
                    );
                    return Ok(text);
                }
                Err(e) if e.retryable && attempt < self.max_retries => {
                    log::warn!("Retry {}/{} after error: {}", attempt + 1, self.max_retries, e.error);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e.error),
            }
        }
    }
}
