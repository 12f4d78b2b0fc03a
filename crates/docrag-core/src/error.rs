use thiserror::Error;

/// External service a [`Error::ProviderFailure`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Embedding,
    Rerank,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedding => f.write_str("embedding"),
            Self::Rerank => f.write_str("rerank"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{provider} provider failed: {message}")]
    ProviderFailure { provider: Provider, message: String },

    #[error("Persisted index is unusable: {0}")]
    PersistedIndexCorrupt(String),

    #[error("Index operation failed: {0}")]
    Index(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn embedding(message: impl std::fmt::Display) -> Self {
        Self::ProviderFailure { provider: Provider::Embedding, message: message.to_string() }
    }

    pub fn rerank(message: impl std::fmt::Display) -> Self {
        Self::ProviderFailure { provider: Provider::Rerank, message: message.to_string() }
    }

    pub fn index(message: impl std::fmt::Display) -> Self {
        Self::Index(message.to_string())
    }

    /// True when a query failed outright, as opposed to succeeding with no hits.
    /// Callers report these as "search unavailable".
    pub fn is_search_unavailable(&self) -> bool {
        matches!(self, Self::ProviderFailure { .. } | Self::Index(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
