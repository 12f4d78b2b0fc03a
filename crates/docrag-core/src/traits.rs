use crate::error::Result;
use crate::types::RerankScore;

/// Text-in, fixed-dimension-vector-out embedding provider.
///
/// Implementations must return exactly one vector of length [`Embedder::dim`]
/// per input text, in input order. Failures surface as
/// [`crate::error::Error::ProviderFailure`] and are not retried.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-small`).
    /// Persisted alongside vectors so a store built by another model is rejected.
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Secondary relevance model applied to a small candidate set.
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_n` entries
    /// ordered best first. Indices refer to positions in `documents`.
    fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankScore>>;
}
