//! Arrow schemas of the persisted semantic index.
//!
//! `chunks` holds one row per chunk with its embedding; `meta` is a small
//! key/value table describing how the index was built.
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const CHUNKS_TABLE: &str = "chunks";
pub const META_TABLE: &str = "meta";

/// Columns every readable `chunks` table must carry.
pub const CHUNK_COLUMNS: [&str; 8] =
	["id", "doc_path", "format", "content", "chunk_index", "total_chunks", "start_offset", "vector"];

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("doc_path", DataType::Utf8, false),
		Field::new("format", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("chunk_index", DataType::Int32, false),
		Field::new("total_chunks", DataType::Int32, false),
		Field::new("start_offset", DataType::Int64, true),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}

/// Width of the `vector` column, if the schema has one of the expected shape.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name("vector").ok()?.data_type() {
		DataType::FixedSizeList(item, n) if item.data_type() == &DataType::Float32 => usize::try_from(*n).ok(),
		_ => None,
	}
}
