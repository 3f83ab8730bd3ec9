//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from a chat-completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("cannot connect to {url}")]
    Connect { url: String },

    #[error("failed to send request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("response contained no choices")]
    EmptyResponse,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completions request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// A request carrying a single user message and no sampling options.
    pub fn single_user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text-in, text-out chat completion.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send one request and return the first choice's message content.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Request headers for error reports, with secrets redacted.
    fn redacted_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Where and how to reach a chat-completions endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointConfig {
    /// Full chat-completions URL.
    pub url: String,
    /// Bearer token; requests go out unauthenticated when absent.
    pub api_key: Option<String>,
    /// Additional headers sent with every request.
    pub extra_headers: Vec<(String, String)>,
    /// Request timeout; `None` waits indefinitely.
    pub timeout_seconds: Option<u64>,
}

/// Client for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiCompatibleClient {
    endpoint: EndpointConfig,
    http_client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    /// Create a client for an endpoint.
    pub fn new(endpoint: EndpointConfig) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(seconds) = endpoint.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder.build().map_err(LlmError::Client)?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                seconds: self.endpoint.timeout_seconds.unwrap_or_default(),
            }
        } else if e.is_connect() {
            LlmError::Connect {
                url: self.endpoint.url.clone(),
            }
        } else {
            LlmError::Transport(e)
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        debug!(
            "POST {} (model {}, {} messages)",
            self.endpoint.url,
            request.model,
            request.messages.len()
        );

        let mut builder = self.http_client.post(&self.endpoint.url).json(request);
        if let Some(ref key) = self.endpoint.api_key {
            builder = builder.bearer_auth(key);
        }
        for (name, value) in &self.endpoint.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion(&body)
    }

    fn redacted_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(
            "Authorization".to_string(),
            match self.endpoint.api_key {
                Some(_) => "Bearer [REDACTED]".to_string(),
                None => "<none>".to_string(),
            },
        )];
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        headers.extend(self.endpoint.extra_headers.iter().cloned());
        headers
    }
}

/// Extract `choices[0].message.content` from a response body.
pub fn parse_completion(body: &str) -> Result<String, LlmError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or(LlmError::EmptyResponse)
}

/// Describe a failed request the way it is shown in place of the model's answer.
pub fn describe_failure(
    error: &LlmError,
    request: &ChatRequest,
    headers: &[(String, String)],
) -> String {
    let payload = serde_json::to_string(request).unwrap_or_else(|_| "<unserializable>".to_string());
    let headers = headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join(", ");

    format!("Error: {}\n\nPayload: {}\nHeaders: {{{}}}", error, payload, headers)
}
