use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use docrag_core::error::Result;
use docrag_core::traits::Embedder;

/// Deterministic, offline feature-hashing embedder.
///
/// Each normalized token lands in one bucket of a `dim`-wide vector, then the
/// vector is L2-normalized. Texts sharing words get positive cosine similarity;
/// texts with no words in common (barring bucket collisions) get zero. Text
/// without any word maps to the uniform unit vector, so cosine scores against
/// it stay finite. Used for
/// development and tests where no model or network is available.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 { return v; }
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt();
        if norm == 0.0 {
            return vec![1.0 / (self.dim as f32).sqrt(); self.dim];
        }
        for x in &mut v { *x /= norm; }
        v
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
