use std::hash::{DefaultHasher, Hash, Hasher};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// Feature-hashing bag-of-words embedder.
///
/// Lowercased alphanumeric tokens are hashed into `dimension` buckets and the
/// resulting count vector is L2-normalized. Texts sharing words land close
/// together. Needs no model download.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub const MODEL_NAME: &'static str = "hashing";

    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidArgument("embedding dimension must be at least 1".to_string()));
        }
        Ok(Self { dimension })
    }

    fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }
}
