//! Persisted semantic index on LanceDB.
//!
//! The persistence root holds build generations (see [`generation`]); each one
//! has a `chunks` table (chunk columns plus a fixed-width `vector`) and a
//! `meta` table. The public API is synchronous: each
//! [`SemanticIndex`] owns a tokio runtime that drives LanceDB, while embedding
//! calls run on the caller's thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use lancedb::{Connection, Table};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;
use docrag_core::types::{corpus_fingerprint, Chunk, RankedResult};

pub mod generation;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use table::IndexMeta;

use schema::{vector_dim, CHUNKS_TABLE, CHUNK_COLUMNS};
use table::{open_db, read_meta, table_exists, write_meta};
use writer::{embed_chunks, write_chunks};

pub const DEFAULT_EMBED_BATCH: usize = 64;

pub struct SemanticIndex {
	table: Table,
	_conn: Connection,
	embedder: Arc<dyn Embedder>,
	meta: IndexMeta,
	path: PathBuf,
	generation: PathBuf,
	// Dropped last: LanceDB handles above may still reference it.
	runtime: Runtime,
}

fn new_runtime() -> Result<Runtime> {
	Ok(tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build()?)
}

fn uri(path: &Path) -> String { path.to_string_lossy().into_owned() }

impl SemanticIndex {
	/// True when `path` looks like it holds an index (an existing, non-empty directory).
	pub fn is_persisted(path: &Path) -> bool {
		path.is_dir() && std::fs::read_dir(path).map(|mut d| d.next().is_some()).unwrap_or(false)
	}

	pub fn build(chunks: &[Chunk], embedder: Arc<dyn Embedder>, path: &Path) -> Result<Self> {
		Self::build_batched(chunks, embedder, path, DEFAULT_EMBED_BATCH)
	}

	/// Embed `chunks` and persist them under `path` as a new generation.
	///
	/// Vectors are computed before anything is written, and the new generation
	/// only becomes current once its tables are complete, so a failed build
	/// leaves the previous index loadable. The generation this build replaces
	/// stays on disk until the next build, so an index opened from it keeps
	/// answering queries.
	pub fn build_batched(chunks: &[Chunk], embedder: Arc<dyn Embedder>, path: &Path, batch_size: usize) -> Result<Self> {
		if chunks.is_empty() {
			return Err(Error::InvalidArgument("cannot build a semantic index from zero chunks".into()));
		}
		let dim = embedder.dim();
		info!(chunks = chunks.len(), embedder = embedder.embedder_id(), dim, "embedding chunks");
		let vectors = embed_chunks(chunks, embedder.as_ref(), batch_size)?;

		let meta = IndexMeta {
			embedder_id: embedder.embedder_id().to_string(),
			dim,
			chunk_count: chunks.len(),
			corpus_fingerprint: corpus_fingerprint(chunks),
			built_at: Utc::now(),
		};
		let runtime = new_runtime()?;
		let previous = generation::current(path).ok();
		let dir = generation::allocate(path)?;
		let written = runtime
			.block_on(persist(&dir, chunks, &vectors, &meta))
			.and_then(|handles| generation::publish(path, &dir).map(|()| handles));
		let (conn, table) = match written {
			Ok(handles) => handles,
			Err(e) => {
				generation::discard(&dir);
				return Err(e);
			}
		};
		let keep: Vec<&Path> = std::iter::once(dir.as_path()).chain(previous.as_deref()).collect();
		generation::prune(path, &keep);
		info!(path = %dir.display(), chunks = chunks.len(), "semantic index persisted");
		Ok(Self { table, _conn: conn, embedder, meta, path: path.to_path_buf(), generation: dir, runtime })
	}

	/// Open a persisted index without re-embedding anything.
	///
	/// Every structural problem (no current generation, missing tables or
	/// columns, an embedder whose id or dimension differs from the one that
	/// built the index, zero rows, an unreadable store) is reported as
	/// [`Error::PersistedIndexCorrupt`].
	pub fn try_load(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
		if !Self::is_persisted(path) {
			return Err(Error::PersistedIndexCorrupt(format!("no index at {}", path.display())));
		}
		let dir = generation::current(path)?;
		let runtime = new_runtime()?;
		let (conn, table, meta) = runtime.block_on(open_existing(&dir, embedder.as_ref())).map_err(corrupt)?;
		debug!(path = %dir.display(), chunks = meta.chunk_count, "semantic index loaded");
		Ok(Self { table, _conn: conn, embedder, meta, path: path.to_path_buf(), generation: dir, runtime })
	}

	/// [`Self::try_load`] with the failure reason discarded.
	pub fn load(path: &Path, embedder: Arc<dyn Embedder>) -> Option<Self> {
		Self::try_load(path, embedder).ok()
	}

	/// Top-`k` chunks by cosine similarity to `text`, best first.
	pub fn query(&self, text: &str, k: usize) -> Result<RankedResult> {
		if k == 0 {
			return Ok(Vec::new());
		}
		let mut vectors = self.embedder.embed_batch(&[text.to_string()])?;
		let vector = vectors.pop().ok_or_else(|| Error::embedding("no vector returned for query"))?;
		if vector.len() != self.meta.dim {
			return Err(Error::embedding(format!("dim mismatch: got {} expected {}", vector.len(), self.meta.dim)));
		}
		self.runtime.block_on(search::nearest(&self.table, vector, k))
	}

	pub fn len(&self) -> usize { self.meta.chunk_count }

	pub fn is_empty(&self) -> bool { self.meta.chunk_count == 0 }

	pub fn meta(&self) -> &IndexMeta { &self.meta }

	pub fn fingerprint(&self) -> &str { &self.meta.corpus_fingerprint }

	pub fn path(&self) -> &Path { &self.path }

	/// Directory of the generation this index reads from.
	pub fn generation_dir(&self) -> &Path { &self.generation }
}

async fn persist(path: &Path, chunks: &[Chunk], vectors: &[Vec<f32>], meta: &IndexMeta) -> Result<(Connection, Table)> {
	let conn = open_db(&uri(path)).await?;
	write_chunks(&conn, chunks, vectors, meta.dim).await?;
	write_meta(&conn, meta).await?;
	let table = conn.open_table(CHUNKS_TABLE).execute().await.map_err(Error::index)?;
	Ok((conn, table))
}

async fn open_existing(path: &Path, embedder: &dyn Embedder) -> Result<(Connection, Table, IndexMeta)> {
	let conn = open_db(&uri(path)).await?;
	let meta = read_meta(&conn).await?;
	if meta.embedder_id != embedder.embedder_id() {
		return Err(Error::PersistedIndexCorrupt(format!(
			"built with embedder '{}', current embedder is '{}'",
			meta.embedder_id,
			embedder.embedder_id()
		)));
	}
	if meta.dim != embedder.dim() {
		return Err(Error::PersistedIndexCorrupt(format!("built with dim {}, embedder has {}", meta.dim, embedder.dim())));
	}
	if !table_exists(&conn, CHUNKS_TABLE).await? {
		return Err(Error::PersistedIndexCorrupt(format!("table '{CHUNKS_TABLE}' missing")));
	}
	let table = conn.open_table(CHUNKS_TABLE).execute().await.map_err(Error::index)?;
	let schema = table.schema().await.map_err(Error::index)?;
	if let Some(col) = CHUNK_COLUMNS.iter().find(|c| schema.field_with_name(c).is_err()) {
		return Err(Error::PersistedIndexCorrupt(format!("column '{col}' missing")));
	}
	if vector_dim(&schema) != Some(meta.dim) {
		return Err(Error::PersistedIndexCorrupt("vector column does not match recorded dim".into()));
	}
	let rows = table.count_rows(None).await.map_err(Error::index)?;
	if rows == 0 {
		return Err(Error::PersistedIndexCorrupt("index has zero rows".into()));
	}
	if rows != meta.chunk_count {
		return Err(Error::PersistedIndexCorrupt(format!("{rows} rows, meta records {}", meta.chunk_count)));
	}
	Ok((conn, table, meta))
}

fn corrupt(e: Error) -> Error {
	match e {
		Error::PersistedIndexCorrupt(_) => e,
		other => Error::PersistedIndexCorrupt(other.to_string()),
	}
}
