//! Optional second-stage reranking of fused candidates.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use docrag_core::config::{RerankBackend, RerankSettings};
use docrag_core::error::{Error, Result};
use docrag_core::traits::Reranker;
use docrag_core::types::{RankedResult, RerankScore, ScoredChunk, SourceKind};

/// Re-score `candidates` with `reranker` and keep the best `top_n`.
///
/// The output only ever contains candidates, each at most once, and always
/// holds `min(top_n, candidates.len())` entries: when the provider returns
/// fewer results, the remaining candidates follow in their fused order with a
/// score of `0.0`.
pub fn rerank(reranker: &dyn Reranker, query: &str, candidates: &[ScoredChunk], top_n: usize) -> Result<RankedResult> {
    let want = top_n.min(candidates.len());
    if want == 0 {
        return Ok(Vec::new());
    }
    let documents: Vec<String> = candidates.iter().map(|c| c.chunk.content.clone()).collect();
    let mut scores = reranker.rerank(query, &documents, want)?;
    if let Some(bad) = scores.iter().find(|s| s.index >= candidates.len()) {
        return Err(Error::rerank(format!(
            "result index {} outside candidate set of {}",
            bad.index,
            candidates.len()
        )));
    }
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut taken = vec![false; candidates.len()];
    let mut out = Vec::with_capacity(want);
    for s in scores {
        if out.len() == want {
            break;
        }
        if std::mem::replace(&mut taken[s.index], true) {
            continue;
        }
        out.push(ScoredChunk { chunk: candidates[s.index].chunk.clone(), score: s.score, source: SourceKind::Reranked });
    }
    let padded = want - out.len();
    for (c, _) in candidates.iter().zip(&taken).filter(|(_, t)| !**t).take(padded) {
        out.push(ScoredChunk { chunk: c.chunk.clone(), score: 0.0, source: SourceKind::Reranked });
    }
    if padded > 0 {
        debug!(padded, "rerank provider returned fewer results than requested");
    }
    Ok(out)
}

/// Build the reranker named by `settings.backend`.
pub fn reranker_from_settings(settings: &RerankSettings) -> Result<Arc<dyn Reranker>> {
    match settings.backend {
        RerankBackend::Cohere => Ok(Arc::new(CohereReranker::new(settings)?)),
        RerankBackend::TermOverlap => Ok(Arc::new(TermOverlapReranker)),
    }
}

/// Cohere-compatible `/rerank` endpoint.
pub struct CohereReranker {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Debug, Deserialize)]
struct RerankItem {
    index: usize,
    relevance_score: f32,
}

impl CohereReranker {
    pub fn new(settings: &RerankSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            Error::InvalidConfig(format!("{} environment variable not set", settings.api_key_env))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(Error::rerank)?;
        Ok(Self {
            client,
            url: format!("{}/rerank", settings.api_base.trim_end_matches('/')),
            api_key,
            model: settings.model.clone(),
        })
    }
}

impl Reranker for CohereReranker {
    fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankScore>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "query": query,
                "documents": documents,
                "top_n": top_n,
            }))
            .send()
            .map_err(Error::rerank)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(Error::rerank(format!("rerank request failed ({status}): {body}")));
        }
        let parsed: RerankResponse = resp.json().map_err(Error::rerank)?;
        Ok(parsed.results.into_iter().map(|r| RerankScore { index: r.index, score: r.relevance_score }).collect())
    }
}

/// Offline reranker: fraction of distinct query terms present in each document.
pub struct TermOverlapReranker;

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Reranker for TermOverlapReranker {
    fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankScore>> {
        let q = terms(query);
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let mut scores: Vec<RerankScore> = documents
            .iter()
            .enumerate()
            .map(|(index, d)| {
                let doc = terms(d);
                let hits = q.iter().filter(|t| doc.contains(*t)).count();
                RerankScore { index, score: hits as f32 / q.len() as f32 }
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores.truncate(top_n);
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrag_core::types::{Chunk, DocFormat};

    fn cand(text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: format!("{text}#0"),
                doc_path: text.to_string(),
                format: DocFormat::Plain,
                content: text.to_string(),
                chunk_index: 0,
                total_chunks: 1,
                start_offset: None,
            },
            score: 0.01,
            source: SourceKind::Fused,
        }
    }

    struct Fixed(Vec<RerankScore>);

    impl Reranker for Fixed {
        fn rerank(&self, _q: &str, _d: &[String], _n: usize) -> Result<Vec<RerankScore>> { Ok(self.0.clone()) }
    }

    fn texts(r: &RankedResult) -> Vec<&str> { r.iter().map(|s| s.chunk.content.as_str()).collect() }

    #[test]
    fn reorders_by_provider_score() {
        let c = vec![cand("a"), cand("b"), cand("c")];
        let r = Fixed(vec![RerankScore { index: 2, score: 0.9 }, RerankScore { index: 0, score: 0.4 }]);
        let out = rerank(&r, "q", &c, 2).unwrap();
        assert_eq!(texts(&out), vec!["c", "a"]);
        assert!(out.iter().all(|s| s.source == SourceKind::Reranked));
    }

    #[test]
    fn short_provider_answer_is_padded_in_fused_order() {
        let c = vec![cand("a"), cand("b"), cand("c"), cand("d")];
        let r = Fixed(vec![RerankScore { index: 2, score: 0.9 }]);
        let out = rerank(&r, "q", &c, 3).unwrap();
        assert_eq!(texts(&out), vec!["c", "a", "b"]);
        assert_eq!(out[1].score, 0.0);
    }

    #[test]
    fn duplicate_indices_count_once() {
        let c = vec![cand("a"), cand("b")];
        let r = Fixed(vec![RerankScore { index: 1, score: 0.9 }, RerankScore { index: 1, score: 0.8 }]);
        let out = rerank(&r, "q", &c, 2).unwrap();
        assert_eq!(texts(&out), vec!["b", "a"]);
    }

    #[test]
    fn out_of_range_index_is_a_provider_failure() {
        let c = vec![cand("a")];
        let r = Fixed(vec![RerankScore { index: 5, score: 1.0 }]);
        let err = rerank(&r, "q", &c, 1).unwrap_err();
        assert!(matches!(err, Error::ProviderFailure { .. }));
    }

    #[test]
    fn top_n_larger_than_candidates() {
        let c = vec![cand("a"), cand("b")];
        let out = rerank(&TermOverlapReranker, "b", &c, 10).unwrap();
        assert_eq!(texts(&out), vec!["b", "a"]);
        assert!(rerank(&TermOverlapReranker, "b", &[], 10).unwrap().is_empty());
    }

    #[test]
    fn term_overlap_prefers_covering_documents() {
        let docs = vec!["Apache HTTPD configuration guide.".to_string(), "LENA is a server platform.".to_string()];
        let s = TermOverlapReranker.rerank("server platform", &docs, 2).unwrap();
        assert_eq!(s[0].index, 1);
        assert!((s[0].score - 1.0).abs() < 1e-6);
        assert_eq!(s[1].score, 0.0);
    }
}
