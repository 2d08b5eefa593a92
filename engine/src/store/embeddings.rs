//! Text embeddings for similarity search
//!
//! The vector store does not embed on its own when reached over HTTP, so
//! documents and query texts are embedded here before they are sent.

use crate::config::OpenAIConfig;
use crate::secrets::{SecretCache, SecretManager, OPENAI_API_KEY};
use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Turns texts into embedding vectors, one per input, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI `/embeddings` client
pub struct OpenAIEmbedder {
    base_url: String,
    model: String,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(config: &OpenAIConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            secret_cache,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.secret_cache.get_secret(OPENAI_API_KEY)?;
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.unsecure()))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EngineError::Lookup(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::Lookup(format!(
                "Embedding error ({}): {}",
                status,
                SecretManager::scrub(&error_text)
            )));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Lookup(format!("Invalid embedding response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(EngineError::Lookup(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
