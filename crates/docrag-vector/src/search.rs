use arrow_array::{Array, Float32Array, Int32Array, Int64Array, RecordBatch};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use docrag_core::error::{Error, Result};
use docrag_core::types::{Chunk, DocFormat, RankedResult, ScoredChunk, SourceKind};

use crate::table::string_column;

/// Exact cosine nearest neighbours of `vector`, best first.
pub async fn nearest(table: &Table, vector: Vec<f32>, k: usize) -> Result<RankedResult> {
	let mut stream = table
		.vector_search(vector)
		.map_err(Error::index)?
		.distance_type(DistanceType::Cosine)
		.limit(k)
		.execute()
		.await
		.map_err(Error::index)?;
	let mut hits = Vec::with_capacity(k);
	while let Some(batch) = stream.try_next().await.map_err(Error::index)? {
		hits.extend(batch_to_scored(&batch)?);
	}
	hits.sort_by(|a, b| b.score.total_cmp(&a.score));
	hits.truncate(k);
	Ok(hits)
}

/// Turn a result batch back into chunks. Score is `1 - cosine distance`.
pub fn batch_to_scored(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
	let ids = string_column(batch, "id").map_err(as_index_error)?;
	let paths = string_column(batch, "doc_path").map_err(as_index_error)?;
	let formats = string_column(batch, "format").map_err(as_index_error)?;
	let contents = string_column(batch, "content").map_err(as_index_error)?;
	let chunk_indices = typed_column::<Int32Array>(batch, "chunk_index")?;
	let totals = typed_column::<Int32Array>(batch, "total_chunks")?;
	let offsets = typed_column::<Int64Array>(batch, "start_offset")?;
	let distances = typed_column::<Float32Array>(batch, "_distance")?;

	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let format = DocFormat::parse(formats.value(i))
			.ok_or_else(|| Error::index(format!("unknown document format '{}'", formats.value(i))))?;
		let chunk = Chunk {
			id: ids.value(i).to_string(),
			doc_path: paths.value(i).to_string(),
			format,
			content: contents.value(i).to_string(),
			chunk_index: usize::try_from(chunk_indices.value(i)).unwrap_or_default(),
			total_chunks: usize::try_from(totals.value(i)).unwrap_or_default(),
			start_offset: if offsets.is_null(i) { None } else { usize::try_from(offsets.value(i)).ok() },
		};
		// Zero vectors have no cosine distance; rank them last.
		let score = 1.0 - distances.value(i);
		let score = if score.is_finite() { score } else { 0.0 };
		out.push(ScoredChunk { chunk, score, source: SourceKind::Semantic });
	}
	Ok(out)
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::index(format!("result column '{name}' missing or mistyped")))
}

fn as_index_error(e: Error) -> Error {
	match e {
		Error::PersistedIndexCorrupt(msg) => Error::Index(msg),
		other => other,
	}
}
