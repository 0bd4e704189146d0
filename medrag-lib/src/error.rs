//! Error types for medrag

use thiserror::Error;

/// Result type alias for medrag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in medrag operations.
///
/// An empty corpus or an empty search result is not an error; those are
/// represented by empty collections.
#[derive(Error, Debug)]
pub enum Error {
    /// A vector did not have the dimension the index was built for
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Caller supplied an unusable argument (k == 0, blank query, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted index artifacts are missing, malformed or do not pair up
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// The embedding model could not be loaded or failed to produce vectors
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The answer generator failed to produce a response
    #[error("generation failed: {0}")]
    Generation(String),

    /// Configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Corpus input could not be read
    #[error("corpus error: {0}")]
    Corpus(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
