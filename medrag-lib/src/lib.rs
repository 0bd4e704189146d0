//! medrag - retrieval engine for a medical reference chatbot
//!
//! # Architecture
//!
//! ```text
//! Records -> corpus::prepare -> Embedder (batch) -> KnowledgeBase -> persist::save
//!                                                         |
//! Query -> Embedder (single) -> KnowledgeBase::search <---+ (persist::load)
//!                                      |
//!                               (label, distance) -> AnswerGenerator
//! ```
//!
//! # Example
//!
//! ```ignore
//! use medrag_lib::{corpus, embed::HashingEmbedder, search::SearchEngine, store::persist};
//!
//! let records = corpus::load_records("data/mayo_disease_data.json")?;
//! let engine = SearchEngine::build(HashingEmbedder::new(384)?, &records, 32)?;
//! persist::save(engine.knowledge_base(), "index.bin", "metadata.json")?;
//!
//! let results = engine.search("fever and cough", 3)?;
//! ```

pub mod chat;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod eval;
pub mod index;
pub mod search;
pub mod store;

pub use error::{Error, Result};
