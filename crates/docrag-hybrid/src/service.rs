use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use docrag_core::config::Settings;
use docrag_core::error::Result;
use docrag_core::traits::{Embedder, Reranker};
use docrag_core::types::SearchHit;
use docrag_embed::default_embedder;

use crate::lifecycle::IndexLifecycle;
use crate::rerank::reranker_from_settings;
use crate::retriever::HybridRetriever;

/// Long-lived query handle: init, then ready, then optional explicit rebuild.
///
/// When ingestion found no documents the service exists but is not ready,
/// and every query answers with no hits.
pub struct RetrievalService {
    lifecycle: IndexLifecycle,
    docs_dir: PathBuf,
    persist_path: PathBuf,
    retriever: Option<Arc<HybridRetriever>>,
}

/// Build a service from configuration, resolving paths against the working directory.
pub fn initialize(settings: &Settings, enable_rerank: bool, force_rebuild: bool) -> Result<RetrievalService> {
    settings.validate()?;
    let base = std::env::current_dir()?;
    let embedder = default_embedder(&settings.embedding)?;
    let reranker = if enable_rerank { Some(reranker_from_settings(&settings.rerank)?) } else { None };
    RetrievalService::start(
        settings.clone(),
        embedder,
        reranker,
        &settings.data.docs_path(&base),
        &settings.data.persist_path(&base),
        force_rebuild,
    )
}

impl RetrievalService {
    /// Build a service from explicit components and paths.
    pub fn start(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        reranker: Option<Arc<dyn Reranker>>,
        docs_dir: &Path,
        persist_path: &Path,
        force_rebuild: bool,
    ) -> Result<Self> {
        let lifecycle = IndexLifecycle::new(settings, embedder, reranker);
        let retriever = lifecycle.get_or_build(docs_dir, persist_path, force_rebuild)?.map(Arc::new);
        info!(ready = retriever.is_some(), docs = %docs_dir.display(), "retrieval service initialized");
        Ok(Self { lifecycle, docs_dir: docs_dir.to_path_buf(), persist_path: persist_path.to_path_buf(), retriever })
    }

    pub fn is_ready(&self) -> bool { self.retriever.is_some() }

    /// Shared handle for callers that query from several threads.
    ///
    /// A handle survives one [`Self::rebuild`]: it keeps answering from the
    /// index generation it was opened on. The rebuild after that removes the
    /// generation, and queries through the stale handle fail.
    pub fn retriever(&self) -> Option<Arc<HybridRetriever>> { self.retriever.clone() }

    pub fn default_k(&self) -> usize { self.lifecycle.settings().retrieval.k }

    pub fn docs_dir(&self) -> &Path { &self.docs_dir }

    pub fn persist_path(&self) -> &Path { &self.persist_path }

    /// Hits for `text`; empty when the service is not ready.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        match &self.retriever {
            Some(r) => r.query(text, k),
            None => Ok(Vec::new()),
        }
    }

    /// Re-ingest the docs directory and re-embed everything.
    ///
    /// The new index is written beside the current one, and the service
    /// switches to it only after the build succeeded. On failure the current
    /// retriever and its persisted index stay in place.
    pub fn rebuild(&mut self) -> Result<()> {
        let retriever = self.lifecycle.get_or_build(&self.docs_dir, &self.persist_path, true)?;
        self.retriever = retriever.map(Arc::new);
        Ok(())
    }
}
