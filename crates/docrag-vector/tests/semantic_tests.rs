use std::sync::Arc;

use docrag_core::error::Error;
use docrag_core::traits::Embedder;
use docrag_core::types::{Chunk, DocFormat, SourceKind};
use docrag_embed::HashEmbedder;
use docrag_vector::SemanticIndex;
use tempfile::TempDir;

fn chunk(path: &str, i: usize, content: &str) -> Chunk {
    Chunk {
        id: format!("{path}#{i}"),
        doc_path: path.to_string(),
        format: DocFormat::Plain,
        content: content.to_string(),
        chunk_index: i,
        total_chunks: 1,
        start_offset: Some(0),
    }
}

fn corpus() -> Vec<Chunk> {
    vec![
        chunk("lena.txt", 0, "LENA is a server platform."),
        chunk("httpd.txt", 0, "Apache HTTPD configuration guide."),
        chunk("fire.txt", 0, "How to start a fire with dry wood and flint."),
    ]
}

fn embedder() -> Arc<dyn Embedder> { Arc::new(HashEmbedder::new(64)) }

/// Same id and width as [`embedder`], but every call fails.
struct DownEmbedder(HashEmbedder);

impl Embedder for DownEmbedder {
    fn embedder_id(&self) -> &str { self.0.embedder_id() }
    fn dim(&self) -> usize { self.0.dim() }
    fn embed_batch(&self, _texts: &[String]) -> docrag_core::Result<Vec<Vec<f32>>> {
        Err(Error::embedding("503 service unavailable"))
    }
}

fn down() -> Arc<dyn Embedder> { Arc::new(DownEmbedder(HashEmbedder::new(64))) }

#[test]
fn build_then_query_ranks_shared_terms_first() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    let index = SemanticIndex::build(&corpus(), embedder(), &path).expect("build");
    assert_eq!(index.len(), 3);
    assert!(SemanticIndex::is_persisted(&path));

    let hits = index.query("server platform", 2).expect("query");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.content, "LENA is a server platform.");
    assert!(hits[0].score >= hits[1].score);
    assert!(hits.iter().all(|h| h.source == SourceKind::Semantic));
}

#[test]
fn loading_twice_gives_identical_results() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    let built = SemanticIndex::build(&corpus(), embedder(), &path).expect("build");
    let fingerprint = built.fingerprint().to_string();
    drop(built);

    let a = SemanticIndex::load(&path, embedder()).expect("first load");
    let b = SemanticIndex::load(&path, embedder()).expect("second load");
    assert_eq!(a.fingerprint(), fingerprint);
    let ra = a.query("fire wood", 3).expect("query a");
    let rb = b.query("fire wood", 3).expect("query b");
    assert_eq!(ra, rb);
    assert_eq!(ra[0].chunk, corpus()[2]);
}

#[test]
fn absent_directory_does_not_load() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("missing");
    assert!(!SemanticIndex::is_persisted(&path));
    assert!(SemanticIndex::load(&path, embedder()).is_none());
}

#[test]
fn garbage_directory_is_corrupt() {
    let tmp = TempDir::new().expect("tmp");
    std::fs::write(tmp.path().join("junk.bin"), b"not a lance table").expect("write");
    assert!(SemanticIndex::is_persisted(tmp.path()));
    let err = SemanticIndex::try_load(tmp.path(), embedder()).err().expect("must fail");
    assert!(matches!(err, Error::PersistedIndexCorrupt(_)), "{err}");
}

#[test]
fn different_embedder_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    SemanticIndex::build(&corpus(), embedder(), &path).expect("build");
    let other: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(32));
    let err = SemanticIndex::try_load(&path, other).err().expect("must fail");
    assert!(matches!(err, Error::PersistedIndexCorrupt(_)));
}

#[test]
fn rebuild_replaces_previous_rows() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    SemanticIndex::build(&corpus(), embedder(), &path).expect("build");
    let smaller = vec![chunk("only.txt", 0, "single chunk")];
    let index = SemanticIndex::build(&smaller, embedder(), &path).expect("rebuild");
    assert_eq!(index.len(), 1);
    let hits = index.query("single", 5).expect("query");
    assert_eq!(hits.len(), 1);
}

#[test]
fn zero_k_and_empty_build() {
    let tmp = TempDir::new().expect("tmp");
    let index = SemanticIndex::build(&corpus(), embedder(), &tmp.path().join("s")).expect("build");
    assert!(index.query("anything", 0).expect("query").is_empty());
    let err = SemanticIndex::build(&[], embedder(), &tmp.path().join("e")).err().expect("must fail");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn provider_failure_during_build_writes_nothing() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    let err = SemanticIndex::build(&corpus(), down(), &path).err().expect("must fail");
    assert!(matches!(err, Error::ProviderFailure { .. }), "{err}");
    assert!(!SemanticIndex::is_persisted(&path));
}

#[test]
fn provider_failure_during_rebuild_keeps_previous_generation() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    let built = SemanticIndex::build(&corpus(), embedder(), &path).expect("build");
    let generation = built.generation_dir().to_path_buf();

    assert!(SemanticIndex::build(&corpus(), down(), &path).is_err());
    let reloaded = SemanticIndex::try_load(&path, embedder()).expect("previous index still loads");
    assert_eq!(reloaded.generation_dir(), generation.as_path());
    assert_eq!(reloaded.len(), 3);
}

#[test]
fn provider_failure_during_query_is_an_error() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    SemanticIndex::build(&corpus(), embedder(), &path).expect("build");
    let index = SemanticIndex::try_load(&path, down()).expect("load needs no embedding");
    let err = index.query("server platform", 2).err().expect("must fail");
    assert!(err.is_search_unavailable());
}

#[test]
fn open_index_survives_one_rebuild() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("store");
    let first = SemanticIndex::build(&corpus(), embedder(), &path).expect("build");
    let second = SemanticIndex::build(&[chunk("only.txt", 0, "single chunk")], embedder(), &path).expect("rebuild");
    assert_ne!(first.generation_dir(), second.generation_dir());

    let hits = first.query("fire wood", 1).expect("old handle still queries");
    assert_eq!(hits[0].chunk, corpus()[2]);
    assert_eq!(SemanticIndex::load(&path, embedder()).expect("load").len(), 1);
}

#[test]
fn wordless_text_scores_are_finite() {
    let tmp = TempDir::new().expect("tmp");
    let mut chunks = corpus();
    chunks.push(chunk("rule.md", 0, "---"));
    let index = SemanticIndex::build(&chunks, embedder(), &tmp.path().join("store")).expect("build");
    for query in ["?!", "server platform"] {
        let hits = index.query(query, 4).expect("query");
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| h.score.is_finite()), "{query}: {hits:?}");
    }
}
