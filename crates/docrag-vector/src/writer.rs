use std::sync::Arc;

use arrow_array::{FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use tracing::info;

use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;
use docrag_core::types::Chunk;

use crate::schema::{build_chunk_schema, CHUNKS_TABLE};

/// Rows per insert into the `chunks` table.
const INSERT_BATCH: usize = 1000;

/// Embed every chunk in `batch_size` slices, checking count and width of each reply.
pub fn embed_chunks(chunks: &[Chunk], embedder: &dyn Embedder, batch_size: usize) -> Result<Vec<Vec<f32>>> {
	let dim = embedder.dim();
	let pb = ProgressBar::new(chunks.len() as u64);
	if let Ok(style) = ProgressStyle::default_bar()
		.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
	{
		pb.set_style(style.progress_chars("#>-"));
	}
	let mut vectors = Vec::with_capacity(chunks.len());
	for slice in chunks.chunks(batch_size.max(1)) {
		let texts: Vec<String> = slice.iter().map(|c| c.content.clone()).collect();
		let batch = embedder.embed_batch(&texts)?;
		if batch.len() != texts.len() {
			return Err(Error::embedding(format!("provider returned {} vectors for {} texts", batch.len(), texts.len())));
		}
		if let Some(bad) = batch.iter().find(|v| v.len() != dim) {
			return Err(Error::embedding(format!("dim mismatch: got {} expected {dim}", bad.len())));
		}
		vectors.extend(batch);
		pb.inc(slice.len() as u64);
	}
	pb.finish_and_clear();
	Ok(vectors)
}

pub fn chunks_to_record_batch(chunks: &[Chunk], vectors: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
	if chunks.len() != vectors.len() {
		return Err(Error::InvalidArgument(format!("{} chunks but {} vectors", chunks.len(), vectors.len())));
	}
	if let Some(bad) = vectors.iter().find(|v| i32::try_from(v.len()).ok() != Some(dim)) {
		return Err(Error::InvalidArgument(format!("vector of width {} in a dim {dim} index", bad.len())));
	}
	let to_i32 = |n: usize| i32::try_from(n).map_err(|_| Error::InvalidArgument(format!("{n} does not fit the chunk index column")));
	let mut chunk_indices = Vec::with_capacity(chunks.len());
	let mut total_chunks = Vec::with_capacity(chunks.len());
	for c in chunks {
		chunk_indices.push(to_i32(c.chunk_index)?);
		total_chunks.push(to_i32(c.total_chunks)?);
	}
	let offsets: Vec<Option<i64>> = chunks.iter().map(|c| c.start_offset.and_then(|o| i64::try_from(o).ok())).collect();
	let vector_items = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

	RecordBatch::try_new(build_chunk_schema(dim), vec![
		Arc::new(StringArray::from(chunks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>())),
		Arc::new(StringArray::from(chunks.iter().map(|c| c.doc_path.as_str()).collect::<Vec<_>>())),
		Arc::new(StringArray::from(chunks.iter().map(|c| c.format.as_str()).collect::<Vec<_>>())),
		Arc::new(StringArray::from(chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>())),
		Arc::new(Int32Array::from(chunk_indices)),
		Arc::new(Int32Array::from(total_chunks)),
		Arc::new(Int64Array::from(offsets)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vector_items, dim)),
	])
	.map_err(Error::index)
}

/// Create the `chunks` table from embedded chunks, inserting in bounded batches.
pub async fn write_chunks(conn: &Connection, chunks: &[Chunk], vectors: &[Vec<f32>], dim: usize) -> Result<()> {
	let dim = i32::try_from(dim).map_err(|_| Error::InvalidArgument(format!("embedding dim {dim} too large")))?;
	let schema = build_chunk_schema(dim);
	let mut table = None;
	for (chunk_slice, vector_slice) in chunks.chunks(INSERT_BATCH).zip(vectors.chunks(INSERT_BATCH)) {
		let rb = chunks_to_record_batch(chunk_slice, vector_slice, dim)?;
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema.clone()));
		match &table {
			None => {
				table = Some(conn.create_table(CHUNKS_TABLE, reader).execute().await.map_err(Error::index)?);
			}
			Some(t) => {
				t.add(reader).execute().await.map_err(Error::index)?;
			}
		}
	}
	info!(chunks = chunks.len(), table = CHUNKS_TABLE, "wrote semantic index rows");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use docrag_core::types::DocFormat;

	fn chunk(i: usize) -> Chunk {
		Chunk {
			id: format!("a.txt#{i}"),
			doc_path: "a.txt".into(),
			format: DocFormat::Plain,
			content: format!("chunk {i}"),
			chunk_index: i,
			total_chunks: 2,
			start_offset: if i == 0 { Some(0) } else { None },
		}
	}

	#[test]
	fn record_batch_has_one_row_per_chunk() {
		let chunks = vec![chunk(0), chunk(1)];
		let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
		let rb = chunks_to_record_batch(&chunks, &vectors, 2).unwrap();
		assert_eq!(rb.num_rows(), 2);
		assert_eq!(rb.num_columns(), 8);
	}

	#[test]
	fn mismatched_vectors_are_rejected() {
		let err = chunks_to_record_batch(&[chunk(0)], &[], 2).unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
	}
}
