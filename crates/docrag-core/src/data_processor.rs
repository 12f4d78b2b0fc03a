use std::path::Path;

use tracing::info;

use crate::chunker::Chunker;
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::loader::DocumentLoader;
use crate::types::Chunk;

/// Output of one ingestion run over a docs directory.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub documents: usize,
    pub chunks: Vec<Chunk>,
}

impl Ingested {
    /// No documents were found; index construction should be skipped.
    pub fn is_empty(&self) -> bool { self.documents == 0 }
}

/// Loader + chunker in one pass: directory in, chunk set out.
pub struct DataProcessor {
    loader: DocumentLoader,
    chunker: Chunker,
}

impl DataProcessor {
    pub fn new(chunking: ChunkingConfig) -> Result<Self> {
        Ok(Self { loader: DocumentLoader::new(), chunker: Chunker::new(chunking)? })
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Ingested> {
        let docs = self.loader.load_directory(data_dir)?;
        if docs.is_empty() {
            info!(dir = %data_dir.display(), "no supported documents found");
            return Ok(Ingested::default());
        }
        let chunks = self.chunker.chunk_documents(&docs)?;
        info!(documents = docs.len(), chunks = chunks.len(), "processed documents into chunks");
        Ok(Ingested { documents: docs.len(), chunks })
    }
}
