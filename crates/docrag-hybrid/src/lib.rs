//! Hybrid retrieval: weighted RRF over a lexical and a semantic index, an
//! optional rerank stage, and the lifecycle that decides when to re-embed.

pub mod fusion;
pub mod lifecycle;
pub mod rerank;
pub mod retriever;
pub mod service;

pub use fusion::{fuse, DEFAULT_RRF_K};
pub use lifecycle::{IndexLifecycle, IndexState};
pub use rerank::{rerank, reranker_from_settings, CohereReranker, TermOverlapReranker};
pub use retriever::{render_hits, HybridRetriever};
pub use service::{initialize, RetrievalService};
