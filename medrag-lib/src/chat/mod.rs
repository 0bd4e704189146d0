//! Retrieval-grounded question answering
//!
//! [`Assistant::ask`] retrieves the records nearest to a question, hands them
//! to an [`AnswerGenerator`] as context and returns its prose. It never
//! fails: errors for one request are logged and replaced by a plain-text
//! apology, so a bad request cannot take the serving process down.
//!
//! # Usage
//!
//! ```ignore
//! use medrag_lib::chat::{Assistant, OpenAiGenerator};
//!
//! let generator = OpenAiGenerator::new(&settings.generator, api_key)?;
//! let assistant = Assistant::new(Arc::new(engine), generator, 5);
//! let reply = assistant.ask("I have a fever and a cough").await;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::embed::Embedder;
use crate::search::SearchEngine;
use crate::store::SearchResult;
use crate::{Error, Result};

mod openai;

pub use openai::*;

/// Reply used when retrieval finds nothing to ground an answer on
pub const NO_CONTEXT_MESSAGE: &str =
    "I couldn't find relevant medical information. Try rephrasing your symptoms.";

/// Reply used when the question is blank
pub const EMPTY_QUERY_MESSAGE: &str = "Please describe your symptoms so I can help.";

/// Reply used when answering failed for any other reason
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I couldn't process your question right now. Please try again in a moment.";

/// System instruction for the answer generator
pub const SYSTEM_PROMPT: &str = "You are a medical assistant giving guidance based on Mayo Clinic \
     reference material. You never diagnose users.";

/// Turns a question plus retrieved context into prose
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str, context: &str) -> Result<String>;
}

/// User prompt combining the retrieved context and the question.
#[must_use]
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "Use the medical context below to suggest possible conditions and treatment options \
         and to guide the user. Do NOT give a formal diagnosis; recommend consulting a \
         healthcare professional instead. Keep the answer concise and split it into short \
         paragraphs, one per condition. If the message below describes no symptoms, ignore \
         the context and reply to it in a friendly manner.\n\n\
         Context:\n{context}\n\n\
         User's symptoms: {query}\n\
         Answer:"
    )
}

/// Joins retrieved results into the generator's context block.
#[must_use]
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(SearchResult::context_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Answers questions from a shared search engine and a generator.
pub struct Assistant<E: Embedder, G: AnswerGenerator> {
    engine: Arc<SearchEngine<E>>,
    generator: G,
    top_k: usize,
}

impl<E: Embedder + 'static, G: AnswerGenerator> Assistant<E, G> {
    pub fn new(engine: Arc<SearchEngine<E>>, generator: G, top_k: usize) -> Self {
        Self {
            engine,
            generator,
            top_k,
        }
    }

    /// Answer `query`, degrading every failure to a fixed message.
    pub async fn ask(&self, query: &str) -> String {
        match self.try_ask(query).await {
            Ok(answer) => answer,
            Err(Error::InvalidArgument(reason)) => {
                debug!(%reason, "rejected query");
                EMPTY_QUERY_MESSAGE.to_string()
            }
            Err(e) => {
                warn!(error = %e, "failed to answer query");
                APOLOGY_MESSAGE.to_string()
            }
        }
    }

    /// Answer `query`, surfacing errors to the caller.
    pub async fn try_ask(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("query is empty".to_string()));
        }

        // embedding is CPU bound; keep it off the async workers
        let engine = Arc::clone(&self.engine);
        let owned = query.to_string();
        let k = self.top_k;
        let results = tokio::task::spawn_blocking(move || engine.search(&owned, k))
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("search task failed: {e}")))??;

        if results.is_empty() {
            return Ok(NO_CONTEXT_MESSAGE.to_string());
        }

        debug!(
            labels = ?results.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
            "retrieved context"
        );
        self.generator.generate(query, &build_context(&results)).await
    }

    #[must_use]
    pub fn engine(&self) -> &SearchEngine<E> {
        &self.engine
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::corpus::Record;
    use crate::embed::HashingEmbedder;

    /// Echoes its context back, or fails when asked to.
    struct EchoGenerator {
        fail: bool,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl EchoGenerator {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnswerGenerator for EchoGenerator {
        async fn generate(&self, query: &str, context: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), context.to_string()));
            if self.fail {
                return Err(Error::Generation("upstream returned 500".to_string()));
            }
            Ok(format!("context was: {context}"))
        }
    }

    fn engine(records: &[Record]) -> Arc<SearchEngine<HashingEmbedder>> {
        Arc::new(SearchEngine::build(HashingEmbedder::new(128).unwrap(), records, 8).unwrap())
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new("Flu", "fever, cough", "virus", "rest"),
            Record::new("Allergy", "sneezing, itchy eyes", "pollen", "antihistamines"),
        ]
    }

    #[tokio::test]
    async fn test_ask_passes_context_lines_to_generator() {
        let assistant = Assistant::new(engine(&records()), EchoGenerator::new(false), 1);

        let answer = assistant.ask("  fever and cough ").await;

        assert_eq!(answer, "context was: Flu: fever, cough virus rest");
        let calls = assistant.generator.calls.lock().unwrap();
        assert_eq!(calls[0].0, "fever and cough");
    }

    #[tokio::test]
    async fn test_context_joins_results_with_newlines() {
        let assistant = Assistant::new(engine(&records()), EchoGenerator::new(false), 5);
        assistant.ask("fever").await;

        let calls = assistant.generator.calls.lock().unwrap();
        assert_eq!(calls[0].1.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_uses_fallback_without_generator() {
        let assistant = Assistant::new(engine(&[]), EchoGenerator::new(false), 3);

        assert_eq!(assistant.ask("fever").await, NO_CONTEXT_MESSAGE);
        assert!(assistant.generator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failure_becomes_apology() {
        let assistant = Assistant::new(engine(&records()), EchoGenerator::new(true), 3);

        assert_eq!(assistant.ask("fever").await, APOLOGY_MESSAGE);
        assert!(matches!(assistant.try_ask("fever").await, Err(Error::Generation(_))));
    }

    #[tokio::test]
    async fn test_blank_query() {
        let assistant = Assistant::new(engine(&records()), EchoGenerator::new(false), 3);

        assert_eq!(assistant.ask("   ").await, EMPTY_QUERY_MESSAGE);
        assert!(assistant.generator.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prompt_contains_context_and_query() {
        let prompt = build_prompt("sore throat", "Strep: sore throat bacteria antibiotics");
        assert!(prompt.contains("Context:\nStrep: sore throat bacteria antibiotics"));
        assert!(prompt.contains("User's symptoms: sore throat"));
        assert!(prompt.ends_with("Answer:"));
    }
}
