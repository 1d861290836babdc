//! Deterministic embedding fakes.

use async_trait::async_trait;
use engram_rs_llm::{EmbeddingClient, LlmError};
use sha2::{Digest, Sha256};

/// Embedding client using the hashing trick over lowercase tokens.
///
/// Deterministic: identical texts embed identically, and texts sharing
/// vocabulary land close in cosine space, which is enough to exercise
/// retrieval without a real embedding model.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();
        let raw = u64::from_le_bytes(digest[..8].try_into().unwrap());
        (raw % self.dimension as u64) as usize
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            vector[self.bucket(token)] += 1.0;
        }
        // Keep the vector non-zero so cosine distance stays defined.
        if vector.iter().all(|v| *v == 0.0) {
            vector[0] = 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedding client that fails every call, for exercising degradation
/// paths.
pub struct FailingEmbeddingClient {
    dimension: usize,
}

impl FailingEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingClient for FailingEmbeddingClient {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Err(LlmError::InvalidResponse(
            "embedding unavailable".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::HashEmbeddingClient;
    use engram_rs_llm::EmbeddingClient;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[tokio::test]
    async fn identical_texts_embed_identically() {
        let client = HashEmbeddingClient::new(16);
        let a = client.embed("hello world").await.unwrap();
        let b = client.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn overlapping_texts_score_high() {
        let client = HashEmbeddingClient::new(64);
        let question = client.embed("How do I deploy?").await.unwrap();
        let memory = client
            .embed("Question: How do I deploy?\nAnswer: Use the release script.")
            .await
            .unwrap();
        assert!(cosine(&question, &memory) > 0.3);
    }

    #[tokio::test]
    async fn empty_text_still_embeds_nonzero() {
        let client = HashEmbeddingClient::new(8);
        let vector = client.embed("").await.unwrap();
        assert!(vector.iter().any(|v| *v != 0.0));
    }
}
