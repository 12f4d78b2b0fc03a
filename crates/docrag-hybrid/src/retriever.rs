use std::sync::Arc;

use tracing::debug;

use docrag_core::config::RetrievalSettings;
use docrag_core::error::Result;
use docrag_core::traits::Reranker;
use docrag_core::types::{RankedResult, SearchHit};
use docrag_text::LexicalIndex;
use docrag_vector::SemanticIndex;

use crate::fusion::fuse;
use crate::rerank::rerank;

/// Both indexes over one chunk set, fused with weighted RRF and optionally reranked.
///
/// Read-only after construction; share it behind an `Arc` for concurrent queries.
pub struct HybridRetriever {
    lexical: LexicalIndex,
    semantic: SemanticIndex,
    reranker: Option<(Arc<dyn Reranker>, usize)>,
    settings: RetrievalSettings,
}

impl HybridRetriever {
    pub fn new(lexical: LexicalIndex, semantic: SemanticIndex, settings: RetrievalSettings) -> Self {
        Self { lexical, semantic, reranker: None, settings }
    }

    /// Enable the rerank stage. Reranked queries return at most `top_n` hits.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>, top_n: usize) -> Self {
        self.reranker = Some((reranker, top_n));
        self
    }

    pub fn reranking_enabled(&self) -> bool { self.reranker.is_some() }

    pub fn lexical(&self) -> &LexicalIndex { &self.lexical }

    pub fn semantic(&self) -> &SemanticIndex { &self.semantic }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    /// Top-`k` chunks for `query`.
    ///
    /// Each index contributes its best `max(fetch_k, k)` chunks (semantic
    /// first), the rankings are fused, and the fused list is either reranked
    /// down to `min(k, top_n)` or truncated to `k`.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<RankedResult> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let depth = self.settings.fetch_k.max(k);
        let semantic = self.semantic.query(query, depth)?;
        let lexical = self.lexical.query(query, depth)?;
        debug!(semantic = semantic.len(), lexical = lexical.len(), "candidates before fusion");
        let mut fused = fuse(
            &[&semantic, &lexical],
            &[self.settings.semantic_weight, self.settings.lexical_weight],
            self.settings.rrf_k,
        )?;
        match &self.reranker {
            Some((r, top_n)) => rerank(r.as_ref(), query, &fused, k.min(*top_n)),
            None => {
                fused.truncate(k);
                Ok(fused)
            }
        }
    }

    pub fn query(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        Ok(self.retrieve(query, k)?.into_iter().map(SearchHit::from).collect())
    }
}

/// Hit texts joined by blank lines, ready to hand to a language model.
pub fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter().map(|h| h.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrag_core::types::SourceKind;

    #[test]
    fn render_joins_with_blank_lines() {
        let hits = vec![
            SearchHit { text: "one".into(), score: 0.2, source: SourceKind::Fused },
            SearchHit { text: "two".into(), score: 0.1, source: SourceKind::Fused },
        ];
        assert_eq!(render_hits(&hits), "one\n\ntwo");
        assert_eq!(render_hits(&[]), "");
    }
}
