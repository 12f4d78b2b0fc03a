use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{info, warn};

use docrag_core::config::{expand_path, EmbeddingSettings};
use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const MAX_LEN: usize = 256;

/// BGE-M3 (XLM-RoBERTa) embeddings computed in-process with candle.
pub struct LocalModelEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    id: String,
}

impl LocalModelEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            Error::InvalidConfig(format!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))
        })?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| Error::InvalidConfig(format!("bad model config {}: {e}", config_path.display())))?;
        let dim = config.hidden_size;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path).map_err(Error::embedding)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(Error::embedding)?;
        info!(dir = %model_dir.display(), dim, "local embedding model loaded");

        Ok(Self { model, tokenizer, device, dim, id: format!("local:bge-m3:d{dim}") })
    }

    fn forward(&self, texts: &[String]) -> candle_core::Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, MAX_LEN, &self.device)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2::<f32>()
    }
}

impl Embedder for LocalModelEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let vectors = self.forward(texts).map_err(Error::embedding)?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 * texts.len() as u128 {
            warn!(batch = texts.len(), elapsed_ms = elapsed.as_millis() as u64, "slow embedding batch");
        }
        Ok(vectors)
    }
}

/// Model directory: explicit setting, then `APP_MODEL_DIR`, then `MODEL_DIR`,
/// then `models/bge-m3` relative to the working directory or its parent.
fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = configured { candidates.push(expand_path(dir)); }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { candidates.push(PathBuf::from(dir)); }
    }
    candidates.push(Path::new("models/bge-m3").to_path_buf());
    candidates.push(Path::new("../models/bge-m3").to_path_buf());
    candidates
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| Error::InvalidConfig("could not locate BGE-M3 model directory".into()))
}
