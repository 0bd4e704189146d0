//! Vector index paired with its metadata table
//!
//! # Storage Model
//!
//! Each stored item consists of:
//! - Vector: the embedding held by the index at position `i`
//! - Entry: the record label and source text at `metadata[i]`
//!
//! Position is the only join key, so vectors and entries are only ever
//! appended together and the two sequences always have the same length.
//!
//! # Usage
//!
//! ```ignore
//! use medrag_lib::store::{KnowledgeBase, persist};
//!
//! let kb = KnowledgeBase::build(384, &vectors, entries)?;
//! persist::save(&kb, "mayo_vectors.bin", "mayo_metadata.json")?;
//!
//! let kb = persist::load("mayo_vectors.bin", "mayo_metadata.json")?;
//! let results = kb.search(&query_vector, 5)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::embed::Embedding;
use crate::index::{FlatIndex, VectorIndex};
use crate::{Error, Result};

pub mod persist;

/// Metadata for one indexed record
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Entry {
    /// Record label, e.g. the disease name
    pub label: String,
    /// Text the vector was computed from
    pub text: String,
}

/// A search result with its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub label: String,
    pub text: String,
    /// Squared Euclidean distance, lower is closer.
    /// Not a bounded similarity score.
    pub distance: f32,
}

impl SearchResult {
    /// Line handed to the answer generator as context
    #[must_use]
    pub fn context_line(&self) -> String {
        format!("{}: {}", self.label, self.text)
    }
}

/// An index together with the metadata table it is positionally joined to.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase<I: VectorIndex = FlatIndex> {
    index: I,
    metadata: Vec<Entry>,
}

impl KnowledgeBase<FlatIndex> {
    /// Empty flat knowledge base for vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Result<Self> {
        Ok(Self {
            index: FlatIndex::new(dimension)?,
            metadata: Vec::new(),
        })
    }

    /// Build a flat knowledge base from a full corpus snapshot.
    pub fn build(dimension: usize, vectors: &[Embedding], entries: Vec<Entry>) -> Result<Self> {
        let mut kb = Self::new(dimension)?;
        kb.insert(vectors, entries)?;
        Ok(kb)
    }
}

impl<I: VectorIndex> KnowledgeBase<I> {
    /// Pair an existing index with its metadata.
    ///
    /// Fails with `CorruptIndex` when the lengths differ.
    pub fn from_parts(index: I, metadata: Vec<Entry>) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(Error::CorruptIndex(format!(
                "index holds {} vectors but metadata has {} entries",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self { index, metadata })
    }

    /// Append vectors and their entries.
    ///
    /// Either everything is added or, on error, nothing is.
    pub fn insert(&mut self, vectors: &[Embedding], entries: Vec<Entry>) -> Result<()> {
        if vectors.len() != entries.len() {
            return Err(Error::InvalidArgument(format!(
                "{} vectors supplied for {} entries",
                vectors.len(),
                entries.len()
            )));
        }

        self.index.add(vectors)?;
        self.metadata.extend(entries);
        Ok(())
    }

    /// Top-k entries nearest to `query`, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let neighbors = self.index.search(query, k)?;

        neighbors
            .into_iter()
            .map(|neighbor| {
                let entry = self.metadata.get(neighbor.position).ok_or_else(|| {
                    Error::CorruptIndex(format!("no metadata for position {}", neighbor.position))
                })?;
                Ok(SearchResult {
                    label: entry.label.clone(),
                    text: entry.text.clone(),
                    distance: neighbor.distance,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn index(&self) -> &I {
        &self.index
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.metadata
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}
