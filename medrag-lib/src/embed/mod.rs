//! Text embedding
//!
//! The embedder is an explicit dependency: it is handed to the search engine
//! for both the offline build and online queries, so tests can swap in the
//! deterministic [`HashingEmbedder`] instead of a downloaded model.
//!
//! # Usage
//!
//! ```ignore
//! use medrag_lib::embed::{Embedder, OnnxEmbedder, ModelKind};
//!
//! let embedder = OnnxEmbedder::new(ModelKind::AllMiniLmL6V2)?;
//!
//! let vectors = embedder.embed(&["fever, cough virus rest", "sneezing pollen"])?;
//! let query = embedder.embed_one("fever and cough")?;
//! ```

use tracing::debug;

use crate::{Error, Result};

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
///
/// Implementations must be deterministic for a fixed model: the same text
/// always produces the same vector within one process.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Output has the same length and order as input.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Embedding> {
        self.embed(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingUnavailable("model returned no embeddings".to_string()))
    }

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).embed(texts)
    }

    fn embed_one(&self, text: &str) -> Result<Embedding> {
        (**self).embed_one(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Embed `texts` in batches of at most `batch_size`, preserving order.
///
/// Each batch must come back with exactly one vector per input.
pub fn embed_batched<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[&str],
    batch_size: usize,
) -> Result<Vec<Embedding>> {
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch size must be at least 1".to_string()));
    }

    let mut embeddings = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size).enumerate() {
        let vectors = embedder.embed(batch)?;
        if vectors.len() != batch.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "model returned {} embeddings for a batch of {}",
                vectors.len(),
                batch.len()
            )));
        }
        debug!(batch = i, size = batch.len(), "embedded batch");
        embeddings.extend(vectors);
    }

    Ok(embeddings)
}

/// Build an embedder from its configured model name.
///
/// `"hashing"` selects the offline [`HashingEmbedder`]; every other name must
/// be one of the [`ModelKind`] identifiers.
pub fn from_model_name(name: &str) -> Result<Box<dyn Embedder>> {
    if name == HashingEmbedder::MODEL_NAME {
        return Ok(Box::new(HashingEmbedder::new(DEFAULT_HASHING_DIMENSION)?));
    }

    let kind: ModelKind = name.parse()?;
    Ok(Box::new(OnnxEmbedder::new(kind)?))
}

/// Dimension used by the hashing embedder when selected by name
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

mod hashing;
mod onnx;

pub use hashing::*;
pub use onnx::*;
