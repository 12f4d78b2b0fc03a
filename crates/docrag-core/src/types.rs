//! Domain types shared by the loader, both indexes and the fusion stage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type ChunkId = String;

/// Source format of an ingested document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    Plain,
    Markdown,
    Pdf,
}

impl DocFormat {
    /// Map a file extension to a supported format. Case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Plain),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
            Self::Pdf => "pdf",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plain" => Some(Self::Plain),
            "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// A loaded source file. Lives only for the duration of an ingestion run.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
    pub format: DocFormat,
}

/// A chunk of a source document that is independently indexed.
///
/// - `id`: `<doc_path>#<chunk_index>`, unique within one ingestion run
/// - `doc_path`: back-reference to the source document
/// - `content`: the text payload of the chunk
/// - `chunk_index`/`total_chunks`: position within the parent document
/// - `start_offset`: byte offset of `content` in the document text, when known
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_path: String,
    pub format: DocFormat,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub start_offset: Option<usize>,
}

/// Which stage produced a score. Scores from different stages are not comparable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Semantic,
    Lexical,
    Fused,
    Reranked,
}

/// One entry of a ranking. Higher `score` is always better within a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub source: SourceKind,
}

pub type RankedResult = Vec<ScoredChunk>;

/// The minimal surface handed to callers of the query interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
    pub source: SourceKind,
}

impl From<ScoredChunk> for SearchHit {
    fn from(s: ScoredChunk) -> Self {
        Self { text: s.chunk.content, score: s.score, source: s.source }
    }
}

/// Relevance assigned by a reranking provider to `documents[index]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankScore {
    pub index: usize,
    pub score: f32,
}

/// Stable fingerprint of a chunk set: order-sensitive hash over ids and contents.
pub fn corpus_fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in chunks {
        hasher.update(c.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(c.content.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}
