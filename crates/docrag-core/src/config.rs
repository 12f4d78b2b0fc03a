//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting levels, e.g. `APP_RERANK__ENABLED=true`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    /// Wrap an already assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Extract and validate the typed settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
        }
        if self.embedding.backend == EmbeddingBackend::Hash && self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub docs_dir: String,
    pub persist_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { docs_dir: "docs".into(), persist_dir: "vector_store".into() }
    }
}

impl DataSettings {
    pub fn docs_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.docs_dir)
    }

    pub fn persist_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.persist_dir)
    }
}

/// Character-based chunk sizing. `chunk_overlap` must stay below `chunk_size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Results returned per query when the caller does not say otherwise.
    pub k: usize,
    /// Depth fetched from each index before fusion.
    pub fetch_k: usize,
    pub rrf_k: f32,
    pub semantic_weight: f32,
    pub lexical_weight: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 4, fetch_k: 20, rrf_k: 60.0, semantic_weight: 0.5, lexical_weight: 0.5 }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(Error::InvalidConfig(format!("retrieval.rrf_k must be positive, got {}", self.rrf_k)));
        }
        for (name, w) in [("semantic_weight", self.semantic_weight), ("lexical_weight", self.lexical_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfig(format!("retrieval.{name} must be a non-negative number, got {w}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Openai,
    Hash,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Vector width of the hash backend; remote/local backends report their own.
    pub dim: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    /// Model directory for the local backend.
    pub model_dir: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Openai,
            model: "text-embedding-3-small".into(),
            api_base: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            dim: 384,
            batch_size: 64,
            timeout_secs: 30,
            model_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RerankBackend {
    Cohere,
    TermOverlap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub enabled: bool,
    pub backend: RerankBackend,
    pub model: String,
    pub api_base: String,
    pub api_key_env: String,
    pub top_n: usize,
    pub timeout_secs: u64,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: RerankBackend::Cohere,
            model: "rerank-multilingual-v3.0".into(),
            api_base: "https://api.cohere.com/v1".into(),
            api_key_env: "COHERE_API_KEY".into(),
            top_n: 3,
            timeout_secs: 30,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let s = Settings::default();
        s.validate().expect("defaults are valid");
        assert_eq!(s.chunking.chunk_size, 1000);
        assert_eq!(s.chunking.chunk_overlap, 200);
        assert!((s.retrieval.rrf_k - 60.0).abs() < f32::EPSILON);
        assert!(!s.rerank.enabled);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let c = ChunkingConfig { chunk_size: 100, chunk_overlap: 100 };
        assert!(matches!(c.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn figment_overrides_nested_keys() {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::string("[rerank]\nenabled = true\ntop_n = 5\n[embedding]\nbackend = \"hash\"\n"));
        let s = Config::from_figment(figment).settings().expect("settings");
        assert!(s.rerank.enabled);
        assert_eq!(s.rerank.top_n, 5);
        assert_eq!(s.embedding.backend, EmbeddingBackend::Hash);
        assert_eq!(s.data.docs_dir, "docs");
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_with_base(base, "docs"), PathBuf::from("/srv/app/docs"));
        assert_eq!(resolve_with_base(base, "/abs/store"), PathBuf::from("/abs/store"));
    }
}
