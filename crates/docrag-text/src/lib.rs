//! docrag-text
//!
//! Tantivy-based lexical (BM25) index over chunks, held entirely in memory.

pub mod tantivy_utils;
pub mod index;

pub use index::LexicalIndex;
