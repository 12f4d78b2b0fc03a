//! LanceDB connection and metadata helpers.
//!
//! The `meta` table is a key/value store recording how the `chunks` table was
//! produced, so a later process can decide whether it can reuse it.
use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};

use docrag_core::error::{Error, Result};

use crate::schema::{build_meta_schema, META_TABLE};

const KEY_EMBEDDER_ID: &str = "embedder_id";
const KEY_DIM: &str = "dim";
const KEY_CHUNK_COUNT: &str = "chunk_count";
const KEY_FINGERPRINT: &str = "corpus_fingerprint";
const KEY_BUILT_AT: &str = "built_at";

/// Build description stored alongside the vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
	pub embedder_id: String,
	pub dim: usize,
	pub chunk_count: usize,
	pub corpus_fingerprint: String,
	pub built_at: DateTime<Utc>,
}

impl IndexMeta {
	fn to_pairs(&self) -> Vec<(&'static str, String)> {
		vec![
			(KEY_EMBEDDER_ID, self.embedder_id.clone()),
			(KEY_DIM, self.dim.to_string()),
			(KEY_CHUNK_COUNT, self.chunk_count.to_string()),
			(KEY_FINGERPRINT, self.corpus_fingerprint.clone()),
			(KEY_BUILT_AT, self.built_at.to_rfc3339()),
		]
	}

	fn from_pairs(map: &HashMap<String, String>) -> std::result::Result<Self, String> {
		let get = |key: &str| map.get(key).cloned().ok_or_else(|| format!("meta key '{key}' missing"));
		let parse_usize = |key: &str| -> std::result::Result<usize, String> {
			get(key)?.parse().map_err(|e| format!("meta key '{key}' is not a number: {e}"))
		};
		let built_at = DateTime::parse_from_rfc3339(&get(KEY_BUILT_AT)?)
			.map_err(|e| format!("meta key '{KEY_BUILT_AT}' is not a timestamp: {e}"))?
			.with_timezone(&Utc);
		Ok(Self {
			embedder_id: get(KEY_EMBEDDER_ID)?,
			dim: parse_usize(KEY_DIM)?,
			chunk_count: parse_usize(KEY_CHUNK_COUNT)?,
			corpus_fingerprint: get(KEY_FINGERPRINT)?,
			built_at,
		})
	}
}

pub async fn open_db(uri: &str) -> Result<Connection> {
	connect(uri).execute().await.map_err(Error::index)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
	let names = conn.table_names().execute().await.map_err(Error::index)?;
	Ok(names.iter().any(|n| n == name))
}

/// Create the `meta` table holding `meta`. Expects a freshly wiped database.
pub async fn write_meta(conn: &Connection, meta: &IndexMeta) -> Result<()> {
	let pairs = meta.to_pairs();
	let now = meta.built_at.timestamp_millis();
	let rb = RecordBatch::try_new(
		build_meta_schema(),
		vec![
			Arc::new(StringArray::from(pairs.iter().map(|(k, _)| *k).collect::<Vec<_>>())),
			Arc::new(StringArray::from(pairs.iter().map(|(_, v)| v.as_str()).collect::<Vec<_>>())),
			Arc::new(TimestampMillisecondArray::from(vec![now; pairs.len()])),
		],
	)
	.map_err(Error::index)?;
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
	conn.create_table(META_TABLE, reader).execute().await.map_err(Error::index)?;
	Ok(())
}

/// Read the `meta` table. A missing table or key is a corrupt index.
pub async fn read_meta(conn: &Connection) -> Result<IndexMeta> {
	if !table_exists(conn, META_TABLE).await? {
		return Err(Error::PersistedIndexCorrupt(format!("table '{META_TABLE}' missing")));
	}
	let t = conn.open_table(META_TABLE).execute().await.map_err(Error::index)?;
	let mut stream = t.query().execute().await.map_err(Error::index)?;
	let mut map = HashMap::new();
	while let Some(batch) = stream.try_next().await.map_err(Error::index)? {
		let keys = string_column(&batch, "key")?;
		let values = string_column(&batch, "value")?;
		for i in 0..batch.num_rows() {
			if keys.is_null(i) || values.is_null(i) { continue; }
			map.insert(keys.value(i).to_string(), values.value(i).to_string());
		}
	}
	IndexMeta::from_pairs(&map).map_err(Error::PersistedIndexCorrupt)
}

pub(crate) fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| Error::PersistedIndexCorrupt(format!("column '{name}' missing or not utf8")))
}
