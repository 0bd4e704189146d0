//! High-level search interface
//!
//! Combines an injected embedder and a knowledge base into a unified search
//! API. The embedder is owned by the engine and used for both the offline
//! build and online queries, so the index and its queries always share one
//! model.
//!
//! # Usage
//!
//! ```ignore
//! use medrag_lib::search::SearchEngine;
//!
//! // Offline: embed and index a corpus snapshot
//! let engine = SearchEngine::build(embedder, &records, 32)?;
//! persist::save(engine.knowledge_base(), "vectors.bin", "metadata.json")?;
//!
//! // Online: serve a previously saved knowledge base
//! let engine = SearchEngine::new(embedder, persist::load("vectors.bin", "metadata.json")?)?;
//! let results = engine.search("fever and cough", 5)?;
//! ```

use tracing::{debug, info};

use crate::corpus::{self, Record};
use crate::embed::{embed_batched, Embedder};
use crate::index::{FlatIndex, VectorIndex};
use crate::store::{KnowledgeBase, SearchResult};
use crate::{Error, Result};

/// Search engine over an immutable knowledge base.
///
/// All query methods take `&self`, so one engine can serve concurrent
/// requests.
pub struct SearchEngine<E: Embedder, I: VectorIndex = FlatIndex> {
    embedder: E,
    kb: KnowledgeBase<I>,
}

impl<E: Embedder> SearchEngine<E, FlatIndex> {
    /// Build a knowledge base from a full corpus snapshot.
    ///
    /// Records without usable text are skipped. An empty corpus produces an
    /// empty, searchable knowledge base.
    pub fn build(embedder: E, records: &[Record], batch_size: usize) -> Result<Self> {
        let entries = corpus::prepare(records);
        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();

        info!(
            records = entries.len(),
            model = embedder.model_name(),
            "embedding corpus"
        );
        let vectors = embed_batched(&embedder, &texts, batch_size)?;

        let kb = KnowledgeBase::build(embedder.dimension(), &vectors, entries)?;
        info!(vectors = kb.len(), dimension = kb.dimension(), "built knowledge base");

        Ok(Self { embedder, kb })
    }
}

impl<E: Embedder, I: VectorIndex> SearchEngine<E, I> {
    /// Serve an existing knowledge base.
    ///
    /// The knowledge base must have been built with an embedder of the same
    /// dimension.
    pub fn new(embedder: E, kb: KnowledgeBase<I>) -> Result<Self> {
        if embedder.dimension() != kb.dimension() {
            return Err(Error::DimensionMismatch {
                expected: kb.dimension(),
                actual: embedder.dimension(),
            });
        }
        Ok(Self { embedder, kb })
    }

    /// Search for the `k` records nearest to the query text.
    ///
    /// May return fewer than `k` results when the knowledge base is small.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("query is empty".to_string()));
        }
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }

        let query_embedding = self.embedder.embed_one(query)?;
        let results = self.kb.search(&query_embedding, k)?;
        debug!(k, returned = results.len(), "search complete");
        Ok(results)
    }

    /// Text of the top-k results, nearest first.
    pub fn retrieve_chunks(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .search(query, k)?
            .into_iter()
            .map(|result| result.text)
            .collect())
    }

    /// Returns the number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kb.len()
    }

    /// Returns `true` if no records are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kb.is_empty()
    }

    /// Returns a reference to the embedder.
    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Returns a reference to the knowledge base.
    #[must_use]
    pub fn knowledge_base(&self) -> &KnowledgeBase<I> {
        &self.kb
    }
}
