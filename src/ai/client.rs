//! OpenAI REST client

use crate::ai::types::{
    ChatRequest, ChatResponseRaw, EmbeddingRequest, EmbeddingResponse, Message, ResponseFormat,
};
use crate::ai::{Embedder, EmbeddingError};
use crate::config::{require_env, OpenAiConfig};
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use thiserror::Error;

/// Transport-level errors from the AI API
#[derive(Debug, Error)]
pub enum AiError {
    /// Connection failed, timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for an OpenAI-compatible API
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    dimensions: usize,
}

impl OpenAiClient {
    /// Creates a client with the default endpoint and models
    pub fn new(api_key: impl Into<String>) -> Self {
        let defaults = OpenAiConfig::default();
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: defaults.base_url,
            chat_model: defaults.chat_model,
            embedding_model: defaults.embedding_model,
            dimensions: defaults.dimensions,
        }
    }

    /// Builds the client from the `[openai]` section
    ///
    /// The API key is read from the environment variable named by
    /// `api-key-env`.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, ConfigError> {
        let api_key = require_env(&config.api_key_env)?;
        Ok(Self::new(api_key)
            .with_base_url(&config.base_url)
            .with_models(&config.chat_model, &config.embedding_model)
            .with_dimensions(config.dimensions))
    }

    /// Sets a custom base URL (proxies, compatible servers, tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_models(mut self, chat: impl Into<String>, embedding: impl Into<String>) -> Self {
        self.chat_model = chat.into();
        self.embedding_model = embedding.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Runs a JSON-mode chat completion and returns the raw message content
    ///
    /// A missing or null message content is returned as an empty string;
    /// interpreting the content is left to the caller.
    pub async fn chat_json(&self, system: &str, user: &str) -> Result<String, AiError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![Message::system(system), Message::user(user)],
            response_format: Some(ResponseFormat::json_object()),
            temperature: None,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Chat completion request failed");
                AiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, error = %message, "Chat completion API error");
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        tracing::debug!(
            model = %self.chat_model,
            duration_ms = start.elapsed().as_millis(),
            "Chat completion"
        );

        Ok(raw
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Creates one embedding for `text`
    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
            dimensions: self.dimensions,
        };

        let response = self
            .http_client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Embedding request failed");
                AiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, error = %message, "Embedding API error");
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let embedded: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let vector = embedded
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::EmptyResponse)?;

        if vector.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.create_embedding(text).await
    }
}
