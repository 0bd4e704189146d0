use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use tracing::info;

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// Sentence embedding models available through fastembed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelKind {
    /// sentence-transformers/all-MiniLM-L6-v2, 384 dimensions
    #[default]
    AllMiniLmL6V2,
    /// BAAI/bge-small-en-v1.5, 384 dimensions
    BgeSmallEnV15,
    /// BAAI/bge-large-en-v1.5, 1024 dimensions
    BgeLargeEnV15,
}

impl ModelKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            Self::BgeSmallEnV15 => "bge-small-en-v1.5",
            Self::BgeLargeEnV15 => "bge-large-en-v1.5",
        }
    }

    #[must_use]
    pub fn dimension(self) -> usize {
        match self {
            Self::AllMiniLmL6V2 | Self::BgeSmallEnV15 => 384,
            Self::BgeLargeEnV15 => 1024,
        }
    }

    fn model(self) -> EmbeddingModel {
        match self {
            Self::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            Self::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            Self::BgeLargeEnV15 => EmbeddingModel::BGELargeENV15,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [Self::AllMiniLmL6V2, Self::BgeSmallEnV15, Self::BgeLargeEnV15]
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown embedding model: {s}")))
    }
}

/// Local ONNX embedder backed by fastembed.
///
/// The model session sits behind a mutex so a single instance can be shared
/// by concurrent request handlers.
pub struct OnnxEmbedder {
    model: Mutex<TextEmbedding>,
    kind: ModelKind,
}

impl OnnxEmbedder {
    /// Load the model, downloading it on first use.
    pub fn new(kind: ModelKind) -> Result<Self> {
        info!(model = %kind, "loading embedding model");
        let opts = TextInitOptions::new(kind.model()).with_show_download_progress(true);

        TextEmbedding::try_new(opts)
            .map(|model| Self {
                model: Mutex::new(model),
                kind,
            })
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }
}

impl Embedder for OnnxEmbedder {
    fn model_name(&self) -> &str {
        self.kind.name()
    }

    fn dimension(&self) -> usize {
        self.kind.dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| Error::EmbeddingUnavailable("embedding model lock poisoned".to_string()))?;

        model
            .embed(texts, None)
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))
    }
}
