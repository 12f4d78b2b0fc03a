use docrag_core::config::{EmbeddingBackend, EmbeddingSettings};
use docrag_embed::{select_embedder, HashEmbedder};
use docrag_core::traits::Embedder;

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force the hashing backend even though the default is a hosted model
    let settings = EmbeddingSettings { dim: 128, ..EmbeddingSettings::default() };
    let embedder = select_embedder(&settings, true).expect("embedder");
    assert_eq!(embedder.embedder_id(), "hash:xxh64:d128");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 128);
    assert_eq!(embedder.dim(), 128);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn hash_backend_selected_from_settings() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::Hash, dim: 32, ..EmbeddingSettings::default() };
    let embedder = select_embedder(&settings, false).expect("embedder");
    assert_eq!(embedder.embedder_id(), "hash:xxh64:d32");
}

#[test]
fn empty_batch_yields_no_vectors() {
    let e = HashEmbedder::new(16);
    assert!(e.embed_batch(&[]).expect("embed").is_empty());
}

#[cfg(not(feature = "local-model"))]
#[test]
fn local_backend_requires_feature() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::Local, ..EmbeddingSettings::default() };
    assert!(select_embedder(&settings, false).is_err());
    assert!(select_embedder(&settings, true).is_ok());
}
