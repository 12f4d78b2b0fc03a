use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument};
use tracing::debug;

use docrag_core::error::{Error, Result};
use docrag_core::types::{Chunk, RankedResult, ScoredChunk, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// In-memory BM25 index over a chunk set.
///
/// Never persisted: it is rebuilt from the full chunk set on every start.
pub struct LexicalIndex {
	index: Index,
	reader: IndexReader,
	ordinal_field: Field,
	text_field: Field,
	chunks: Vec<Chunk>,
}

impl LexicalIndex {
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let ordinal_field = schema.get_field("ordinal").map_err(Error::index)?;
		let text_field = schema.get_field("text").map_err(Error::index)?;

		let mut index_writer: IndexWriter = index
			.writer_with_num_threads(1, WRITER_HEAP_BYTES)
			.map_err(Error::index)?;
		for (ordinal, c) in chunks.iter().enumerate() {
			index_writer
				.add_document(doc!(
					ordinal_field => ordinal as u64,
					text_field => c.content.as_str(),
				))
				.map_err(Error::index)?;
		}
		index_writer.commit().map_err(Error::index)?;
		let reader = index.reader().map_err(Error::index)?;
		debug!(chunks = chunks.len(), "built lexical index");
		Ok(Self { index, reader, ordinal_field, text_field, chunks: chunks.to_vec() })
	}

	pub fn len(&self) -> usize { self.chunks.len() }

	pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

	/// Top-`k` chunks by BM25 score, best first.
	///
	/// Query syntax errors are tolerated: whatever parses is searched, so free
	/// text from users never fails here.
	pub fn query(&self, text: &str, k: usize) -> Result<RankedResult> {
		if k == 0 || self.chunks.is_empty() {
			return Ok(Vec::new());
		}
		let searcher = self.reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
		let (q, errors) = qp.parse_query_lenient(text);
		if !errors.is_empty() {
			debug!(query = text, errors = errors.len(), "lenient query parse dropped parts of the query");
		}
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k)).map_err(Error::index)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(Error::index)?;
			let ordinal = doc
				.get_first(self.ordinal_field)
				.and_then(|v| v.as_u64())
				.ok_or_else(|| Error::index("lexical hit without ordinal"))?;
			let chunk = usize::try_from(ordinal)
				.ok()
				.and_then(|i| self.chunks.get(i))
				.ok_or_else(|| Error::index(format!("lexical ordinal {ordinal} out of range")))?;
			hits.push(ScoredChunk { chunk: chunk.clone(), score, source: SourceKind::Lexical });
		}
		Ok(hits)
	}
}
