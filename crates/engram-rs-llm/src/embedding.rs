//! Text embedding client backed by the OpenAI embeddings API.

use crate::error::LlmError;
use async_trait::async_trait;
use engram_rs_config::EmbeddingConfig;
use log::debug;
use serde::{Deserialize, Serialize};

/// Interface for embedding providers.
///
/// One outbound call per invocation, no retries. Callers decide how to
/// degrade when a call fails.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Fixed dimensionality of produced vectors.
    fn dimension(&self) -> usize;
}

/// Embedding client for the OpenAI embeddings API.
pub struct OpenAiEmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    config: EmbeddingConfig,
}

impl OpenAiEmbeddingClient {
    /// Create a client from config; the API key is shared with the chat
    /// client.
    pub fn new(api_key: impl Into<String>, config: EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            config,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: text.to_string(),
        };
        debug!(
            "embedding request (model={}, text_len={})",
            self.config.model,
            text.len()
        );

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        let vector = body
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("response carried no embedding".to_string()))?;

        if vector.len() != self.config.dimension {
            return Err(LlmError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
