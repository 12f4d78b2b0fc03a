//! docrag-core
//!
//! Shared domain types, traits, configuration and the ingestion front end
//! (document loading and chunking) used by the lexical, semantic and hybrid crates.

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
