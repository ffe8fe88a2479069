use crate::error::IngestError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// An embedding provider. One index must only ever see vectors produced
/// by a single provider configuration; `model_id` is what gets recorded
/// in the persisted index signature for that check.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| IngestError::Provider {
                status: 200,
                detail: "provider returned no embedding for query".to_string(),
            })
    }
}

/// Hosted Gemini embeddings over the `batchEmbedContents` endpoint.
pub struct GeminiEmbedder {
    client: Arc<Client>,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(client: Arc<Client>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Points the client at a different base URL, for mock servers.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn batch_url(&self) -> String {
        format!(
            "{}/{}:batchEmbedContents?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests = texts
            .iter()
            .map(|text| {
                json!({
                    "model": self.model,
                    "content": { "parts": [ { "text": text } ] },
                })
            })
            .collect::<Vec<_>>();

        let response = self
            .client
            .post(self.batch_url())
            .json(&json!({ "requests": requests }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(IngestError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: Value = response.json().await?;
        let embeddings = parsed
            .pointer("/embeddings")
            .and_then(Value::as_array)
            .ok_or_else(|| IngestError::Provider {
                status: status.as_u16(),
                detail: "response has no embeddings array".to_string(),
            })?;

        let mut vectors = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            let values = embedding
                .pointer("/values")
                .and_then(Value::as_array)
                .ok_or_else(|| IngestError::Provider {
                    status: status.as_u16(),
                    detail: "embedding entry has no values".to_string(),
                })?;
            vectors.push(
                values
                    .iter()
                    .filter_map(Value::as_f64)
                    .map(|value| value as f32)
                    .collect(),
            );
        }

        if vectors.len() != texts.len() {
            return Err(IngestError::Provider {
                status: status.as_u16(),
                detail: format!(
                    "expected {} embeddings, provider returned {}",
                    texts.len(),
                    vectors.len()
                ),
            });
        }

        Ok(vectors)
    }
}

/// Deterministic character-trigram hashing embedder. No network, stable
/// across runs; used for offline smoke runs and tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_id: String,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            model_id: format!("hashing-trigram-{}", dimensions.max(1)),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            // FNV-1a over the trigram bytes.
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}
