//! Chat-completions client
//!
//! [`LlmClient`] is the seam the simulation engine calls. The default
//! implementation speaks the OpenAI chat-completions protocol, so any
//! compatible gateway works by changing the base URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use utoipa::ToSchema;

use crate::core::config::LlmConfig;
use crate::core::constants::LLM_RETRY_BASE_DELAY_MS;
use crate::utils::retry::{RetryPolicy, retry_with_backoff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Model tuning knobs; only forwarded to models that understand them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelOptions {
    pub reasoning_effort: Option<String>,
    pub verbosity: Option<String>,
    pub service_tier: Option<String>,
}

impl ModelOptions {
    /// Whether `model` accepts these options
    pub fn supported_by(model: &str) -> bool {
        model.starts_with("gpt-5")
    }
}

/// One chat-completions call
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub options: &'a ModelOptions,
}

impl ChatRequest<'_> {
    /// JSON body for `POST {base}/chat/completions`
    pub fn body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
        });

        if ModelOptions::supported_by(self.model)
            && let Some(obj) = body.as_object_mut()
        {
            let options = [
                ("reasoning_effort", &self.options.reasoning_effort),
                ("verbosity", &self.options.verbosity),
                ("service_tier", &self.options.service_tier),
            ];
            for (key, value) in options {
                if let Some(value) = value {
                    obj.insert(key.to_string(), Value::String(value.clone()));
                }
            }
        }
        body
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Timeouts, rate limits and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Assistant reply text for the conversation in `request`
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, LlmError>;
}

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

/// OpenAI-compatible chat-completions client with per-call timeout and retry
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(LLM_RETRY_BASE_DELAY_MS),
            ),
        })
    }

    #[cfg(test)]
    fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        tracing::debug!(
            model = request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(request.api_key)
            .json(&request.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: provider_error_message(&text),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no message content".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        retry_with_backoff(self.retry, LlmError::is_retryable, || self.send_once(request)).await
    }
}

/// `error.message` from an OpenAI-style error body, else the raw body
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}
