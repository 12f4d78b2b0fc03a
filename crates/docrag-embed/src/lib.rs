//! Embedding providers behind the `Embedder` trait: a hosted OpenAI-compatible
//! endpoint, an offline hashing embedder, and (with `local-model`) BGE-M3 on candle.

use std::sync::Arc;

use tracing::info;

use docrag_core::config::{EmbeddingBackend, EmbeddingSettings};
use docrag_core::error::Result;
use docrag_core::traits::Embedder;

pub mod hashing;
pub mod openai;

#[cfg(feature = "local-model")]
pub mod device;
#[cfg(feature = "local-model")]
pub mod model;
#[cfg(feature = "local-model")]
pub mod pool;
#[cfg(feature = "local-model")]
pub mod tokenize;

pub use hashing::HashEmbedder;
pub use openai::OpenAiEmbedder;

#[cfg(feature = "local-model")]
pub use model::LocalModelEmbedder;
#[cfg(feature = "local-model")]
pub use pool::masked_mean_l2;

fn flag_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build the embedder selected by `settings.backend`.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` overrides the configured backend with the
/// hashing embedder so tests and offline runs never touch a network or model.
pub fn default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let forced = flag_enabled(std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().as_deref());
    select_embedder(settings, forced)
}

/// [`default_embedder`] with the hashing override passed in rather than read from the environment.
pub fn select_embedder(settings: &EmbeddingSettings, force_hash: bool) -> Result<Arc<dyn Embedder>> {
    if force_hash {
        info!(dim = settings.dim, "using hash embedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Arc::new(HashEmbedder::new(settings.dim)));
    }
    match settings.backend {
        EmbeddingBackend::Openai => {
            info!(model = %settings.model, "using OpenAI-compatible embedder");
            Ok(Arc::new(OpenAiEmbedder::new(settings)?))
        }
        EmbeddingBackend::Hash => Ok(Arc::new(HashEmbedder::new(settings.dim))),
        EmbeddingBackend::Local => local_embedder(settings),
    }
}

#[cfg(feature = "local-model")]
fn local_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(LocalModelEmbedder::new(settings)?))
}

#[cfg(not(feature = "local-model"))]
fn local_embedder(_settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    Err(docrag_core::Error::InvalidConfig(
        "embedding.backend = \"local\" requires the `local-model` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_flag_values() {
        assert!(flag_enabled(Some("1")));
        assert!(flag_enabled(Some("TRUE")));
        assert!(!flag_enabled(Some("0")));
        assert!(!flag_enabled(None));
    }
}
