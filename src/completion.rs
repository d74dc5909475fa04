use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::CompletionError;
use crate::types::ChatMessage;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Single prompt in, single response text out.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: TextCompletion + ?Sized> TextCompletion for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        (**self).complete(prompt).await
    }
}

/// Multi-turn chat used by the browser agent to pick its next action.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn from_env(model: impl Into<String>) -> Result<Self, CompletionError> {
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| CompletionError::MissingApiKey(API_KEY_VAR))?;
        Ok(Self::new(api_key, model))
    }

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: model.into(),
            temperature: 0.2,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, messages: Vec<Value>) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": self.temperature,
            }))
            .send()
            .await?;

        let status = response.status();
        let json_resp: Value = response.json().await?;

        if !status.is_success() {
            let message = json_resp["error"]["message"]
                .as_str()
                .unwrap_or("Unknown API error")
                .to_string();
            warn!(status = status.as_u16(), %message, "completion API error");
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content = json_resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| CompletionError::EmptyResponse(json_resp.to_string()))?;

        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content.to_string())
    }
}

#[async_trait]
impl TextCompletion for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.request(vec![json!({"role": "user", "content": prompt})])
            .await
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.request(messages.iter().map(message_to_api).collect())
            .await
    }
}

/// Text-only messages keep the plain string form; a message carrying a
/// screenshot becomes a text part plus an inline PNG part.
pub fn message_to_api(message: &ChatMessage) -> Value {
    match &message.image_png {
        None => json!({"role": message.role, "content": message.content}),
        Some(png) => json!({
            "role": message.role,
            "content": [
                {"type": "text", "text": message.content},
                {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{png}")}},
            ],
        }),
    }
}

/// Strips a Markdown code fence the model may wrap around its JSON.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
