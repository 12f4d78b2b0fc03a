//! Overlapping character-bounded chunking.
//!
//! Plain text and PDF text go through `text-splitter`'s recursive splitter
//! (paragraph, line, sentence, word, grapheme boundaries in that order of
//! preference); markdown goes through its CommonMark-aware splitter.

use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, DocFormat, Document};

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    pub fn chunk_documents(&self, docs: &[Document]) -> Result<Vec<Chunk>> {
        let mut all = Vec::new();
        for doc in docs {
            all.extend(self.chunk_document(doc)?);
        }
        Ok(all)
    }

    /// Split one document. Chunks come back in text order with
    /// `chunk_index`/`total_chunks` filled in; whitespace-only input yields none.
    pub fn chunk_document(&self, doc: &Document) -> Result<Vec<Chunk>> {
        let doc_path = doc.path.to_string_lossy().to_string();
        let pieces = self.split(&doc.text, doc.format)?;
        let total_chunks = pieces.len();
        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (offset, content))| Chunk {
                id: format!("{doc_path}#{chunk_index}"),
                doc_path: doc_path.clone(),
                format: doc.format,
                content,
                chunk_index,
                total_chunks,
                start_offset: Some(offset),
            })
            .collect())
    }

    fn split(&self, text: &str, format: DocFormat) -> Result<Vec<(usize, String)>> {
        let config = ChunkConfig::new(self.config.chunk_size)
            .with_overlap(self.config.chunk_overlap)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?
            .with_trim(true);
        let pieces: Vec<(usize, String)> = match format {
            DocFormat::Markdown => MarkdownSplitter::new(config)
                .chunk_indices(text)
                .map(|(i, s)| (i, s.to_string()))
                .collect(),
            DocFormat::Plain | DocFormat::Pdf => TextSplitter::new(config)
                .chunk_indices(text)
                .map(|(i, s)| (i, s.to_string()))
                .collect(),
        };
        Ok(pieces.into_iter().filter(|(_, s)| !s.trim().is_empty()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(text: &str, format: DocFormat) -> Document {
        Document { path: PathBuf::from("/docs/a.txt"), text: text.to_string(), format }
    }

    fn small(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig { chunk_size: size, chunk_overlap: overlap }).unwrap()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = Chunker::new(ChunkingConfig::default())
            .unwrap()
            .chunk_document(&doc("LENA is a server platform.", DocFormat::Plain))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "LENA is a server platform.");
        assert_eq!(chunks[0].id, "/docs/a.txt#0");
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].start_offset, Some(0));
    }

    #[test]
    fn long_text_respects_size_and_order() {
        let text: String = (0..200).map(|i| format!("word{i} ")).collect();
        let chunks = small(100, 20).chunk_document(&doc(&text, DocFormat::Plain)).unwrap();
        assert!(chunks.len() > 1);
        let mut last_offset = 0;
        for (i, c) in chunks.iter().enumerate() {
            assert!(c.content.chars().count() <= 100, "chunk {i} too long");
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.total_chunks, chunks.len());
            let off = c.start_offset.unwrap();
            assert!(i == 0 || off > last_offset, "chunks are in text order");
            assert_eq!(&text[off..off + c.content.len()], c.content);
            last_offset = off;
        }
    }

    #[test]
    fn neighbours_overlap() {
        let text: String = (0..100).map(|i| format!("w{i:03} ")).collect();
        let chunks = small(50, 20).chunk_document(&doc(&text, DocFormat::Plain)).unwrap();
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let a_end = pair[0].start_offset.unwrap() + pair[0].content.len();
            assert!(pair[1].start_offset.unwrap() < a_end, "next chunk starts inside the previous one");
        }
    }

    #[test]
    fn whitespace_document_yields_nothing() {
        let chunks = small(50, 10).chunk_document(&doc("  \n\n\t ", DocFormat::Plain)).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn markdown_uses_structure_aware_splitting() {
        let text = "# Install\n\nRun the installer.\n\n# Configure\n\nEdit the config file.";
        let chunks = small(40, 0).chunk_document(&doc(text, DocFormat::Markdown)).unwrap();
        assert!(chunks.len() >= 2);
        assert!(chunks[0].content.starts_with("# Install"));
        assert!(chunks.iter().all(|c| c.format == DocFormat::Markdown));
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        let err = Chunker::new(ChunkingConfig { chunk_size: 10, chunk_overlap: 10 }).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
