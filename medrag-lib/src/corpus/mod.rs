//! Corpus records and preprocessing
//!
//! The scraper produces one JSON object per disease page. Each object carries
//! a label and three text sections; sections the scraper could not find are
//! filled with [`PLACEHOLDER`].
//!
//! ```json
//! [
//!   {"disease": "Flu", "symptoms": "fever, cough", "causes": "virus", "treatment": "rest"}
//! ]
//! ```
//!
//! Records with no usable section are dropped by [`prepare`] so they can
//! never be returned by a search.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::Entry;
use crate::{Error, Result};

/// Marker the scraper writes for a section it could not extract
pub const PLACEHOLDER: &str = "Not Available";

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}

/// One corpus entry as yielded by the corpus provider
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Record {
    /// Record identifier, e.g. the disease name
    #[serde(alias = "disease")]
    pub label: String,
    #[serde(default = "placeholder")]
    pub symptoms: String,
    #[serde(default = "placeholder")]
    pub causes: String,
    #[serde(default = "placeholder")]
    pub treatment: String,
}

impl Record {
    pub fn new(
        label: impl Into<String>,
        symptoms: impl Into<String>,
        causes: impl Into<String>,
        treatment: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            symptoms: symptoms.into(),
            causes: causes.into(),
            treatment: treatment.into(),
        }
    }

    /// Searchable text: the three sections joined by single spaces.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{} {} {}", self.symptoms, self.causes, self.treatment)
    }

    /// Returns `true` if at least one section holds real content.
    #[must_use]
    pub fn is_indexable(&self) -> bool {
        [&self.symptoms, &self.causes, &self.treatment]
            .into_iter()
            .any(|section| is_usable(section))
    }
}

fn is_usable(section: &str) -> bool {
    let section = section.trim();
    !section.is_empty() && section != PLACEHOLDER
}

/// Read a JSON array of records from disk.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Corpus(format!("failed to read {}: {e}", path.display())))?;

    serde_json::from_str(&raw)
        .map_err(|e| Error::Corpus(format!("failed to parse {}: {e}", path.display())))
}

/// Turn records into index entries, dropping the ones without content.
///
/// Order of the surviving records is preserved.
pub fn prepare(records: &[Record]) -> Vec<Entry> {
    let entries: Vec<Entry> = records
        .iter()
        .filter(|record| record.is_indexable())
        .map(|record| Entry {
            label: record.label.clone(),
            text: record.text(),
        })
        .collect();

    info!(
        kept = entries.len(),
        dropped = records.len() - entries.len(),
        "prepared corpus"
    );
    entries
}
