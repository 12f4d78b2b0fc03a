use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use docrag_core::config::EmbeddingSettings;
use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;

/// Embedding provider speaking the OpenAI `/embeddings` protocol.
///
/// Any compatible endpoint works through `api_base`. Calls are blocking and
/// never retried; a failed request surfaces as a provider failure.
pub struct OpenAiEmbedder {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    dim: usize,
    id: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Output width of well-known models; anything else is probed once.
fn known_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

impl OpenAiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            Error::InvalidConfig(format!("{} environment variable not set", settings.api_key_env))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(Error::embedding)?;
        let mut embedder = Self {
            client,
            url: format!("{}/embeddings", settings.api_base.trim_end_matches('/')),
            api_key,
            model: settings.model.clone(),
            dim: 0,
            id: format!("openai:{}", settings.model),
        };
        embedder.dim = match known_dimension(&settings.model) {
            Some(d) => d,
            None => {
                let probe = embedder.request(&["dimension probe".to_string()])?;
                let d = probe.first().map(Vec::len).unwrap_or(0);
                debug!(model = %settings.model, dim = d, "probed embedding dimension");
                d
            }
        };
        if embedder.dim == 0 {
            return Err(Error::embedding(format!("model {} returned empty embeddings", settings.model)));
        }
        Ok(embedder)
    }

    fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .map_err(Error::embedding)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(Error::embedding(format!("embeddings request failed ({status}): {body}")));
        }

        let mut parsed: EmbeddingResponse = resp.json().map_err(Error::embedding)?;
        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "mismatched embedding count: got {}, expected {}",
                parsed.data.len(),
                texts.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for OpenAiEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let vectors = self.request(texts)?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::embedding(format!("dim mismatch: got {} expected {}", bad.len(), self.dim)));
        }
        Ok(vectors)
    }
}
