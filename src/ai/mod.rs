//! Generative-AI client
//!
//! `OpenAiClient` talks to an OpenAI-compatible REST API. It backs two
//! capabilities: text embeddings (`Embedder`, used by index sync and vector
//! search) and JSON-mode chat completions (used by the metadata extractor in
//! `enrich`).

mod client;
mod types;

pub use client::{AiError, OpenAiClient};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced while generating an embedding
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Request(#[from] AiError),

    #[error("Embedding response contained no vector")]
    EmptyResponse,

    #[error("Expected a {expected}-dimensional embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Turns text into a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
