//! Generative model client
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const SERVICE: &str = "Generative model";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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

/// Common interface for chat-based generative models.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate one completion for the given messages.
    async fn generate(&self, messages: &[ChatMessage]) -> AppResult<String>;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiChatClient {
    /// Create a new client against the public OpenAI endpoint
    pub fn new(api_key: String, model: String) -> AppResult<Self> {
        Self::with_base_url(
            api_key,
            "https://api.openai.com/v1".to_string(),
            model,
            0.15,
            Duration::from_secs(60),
        )
    }

    /// Create a client with a custom base URL and sampling settings
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
        timeout: Duration,
    ) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "LLM API key is not set (AGRI__LLM__API_KEY)".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        })
    }
}

#[async_trait]
impl GenerativeModel for OpenAiChatClient {
    async fn generate(&self, messages: &[ChatMessage]) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(SERVICE)
                } else {
                    AppError::upstream(SERVICE, format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                SERVICE,
                format!("API error: {} - {}", status, body),
            ));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("failed to parse response: {}", e)))?;

        let text = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::upstream(SERVICE, "response contained no choices"))?;

        tracing::debug!(model = %self.model, chars = text.len(), "generation complete");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
