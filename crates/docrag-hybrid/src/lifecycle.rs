//! Reuse-or-rebuild decision for the persisted semantic index.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use docrag_core::config::Settings;
use docrag_core::data_processor::DataProcessor;
use docrag_core::error::Result;
use docrag_core::traits::{Embedder, Reranker};
use docrag_core::types::{corpus_fingerprint, Chunk};
use docrag_text::LexicalIndex;
use docrag_vector::SemanticIndex;

use crate::retriever::HybridRetriever;

/// What was found at the persistence path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    /// Nothing persisted yet, or a rebuild was requested.
    Absent,
    /// A persisted index loaded successfully.
    PresentValid,
    /// Something is persisted but cannot be used; carries the reason.
    PresentCorrupt(String),
}

pub struct IndexLifecycle {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl IndexLifecycle {
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>, reranker: Option<Arc<dyn Reranker>>) -> Self {
        Self { settings, embedder, reranker }
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    /// Classify `persist_path` without building anything.
    pub fn inspect(&self, persist_path: &Path) -> IndexState {
        if !SemanticIndex::is_persisted(persist_path) {
            return IndexState::Absent;
        }
        match SemanticIndex::try_load(persist_path, self.embedder.clone()) {
            Ok(_) => IndexState::PresentValid,
            Err(e) => IndexState::PresentCorrupt(e.to_string()),
        }
    }

    /// Produce a ready retriever over `docs_dir`.
    ///
    /// Documents are always loaded and chunked because the lexical index is
    /// never persisted. Embedding only happens when the semantic index has to
    /// be (re)built: nothing usable at `persist_path`, or `force_rebuild`.
    /// Returns `None` when the directory holds no documents.
    pub fn get_or_build(&self, docs_dir: &Path, persist_path: &Path, force_rebuild: bool) -> Result<Option<HybridRetriever>> {
        let processor = DataProcessor::new(self.settings.chunking.clone())?;
        let ingested = processor.process_directory(docs_dir)?;
        if ingested.chunks.is_empty() {
            info!(dir = %docs_dir.display(), documents = ingested.documents, "nothing to index; retriever not built");
            return Ok(None);
        }
        let chunks = ingested.chunks;

        let semantic = if force_rebuild {
            info!(path = %persist_path.display(), "rebuild requested");
            self.build(&chunks, persist_path)?
        } else if !SemanticIndex::is_persisted(persist_path) {
            info!(path = %persist_path.display(), "no persisted index; building");
            self.build(&chunks, persist_path)?
        } else {
            match SemanticIndex::try_load(persist_path, self.embedder.clone()) {
                Ok(index) => {
                    self.warn_if_stale(&index, &chunks);
                    info!(path = %persist_path.display(), chunks = index.len(), "reusing persisted semantic index");
                    index
                }
                Err(e) => {
                    warn!(path = %persist_path.display(), error = %e, "persisted index unusable; rebuilding");
                    self.build(&chunks, persist_path)?
                }
            }
        };

        let lexical = LexicalIndex::build(&chunks)?;
        let mut retriever = HybridRetriever::new(lexical, semantic, self.settings.retrieval.clone());
        if let Some(r) = &self.reranker {
            retriever = retriever.with_reranker(r.clone(), self.settings.rerank.top_n);
        }
        Ok(Some(retriever))
    }

    fn build(&self, chunks: &[Chunk], persist_path: &Path) -> Result<SemanticIndex> {
        SemanticIndex::build_batched(chunks, self.embedder.clone(), persist_path, self.settings.embedding.batch_size)
    }

    fn warn_if_stale(&self, index: &SemanticIndex, chunks: &[Chunk]) {
        let current = corpus_fingerprint(chunks);
        if index.fingerprint() != current {
            warn!(
                indexed_chunks = index.len(),
                current_chunks = chunks.len(),
                built_at = %index.meta().built_at,
                "documents changed since the semantic index was built; run a rebuild to pick them up"
            );
        }
    }
}
