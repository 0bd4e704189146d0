//! Runtime configuration
//!
//! Settings come from an optional TOML file; anything the file leaves out
//! takes its default. The generator API key never lives in the file, only
//! the name of the environment variable holding it.
//!
//! ```toml
//! [embedding]
//! model = "all-MiniLM-L6-v2"
//! batch_size = 32
//!
//! [index]
//! vectors = "data/mayo_vectors.bin"
//! metadata = "data/mayo_metadata.json"
//!
//! [retrieval]
//! top_k = 5
//!
//! [generator]
//! model = "gpt-4"
//! base_url = "https://api.openai.com"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 60
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::embed::{HashingEmbedder, ModelKind};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier; fixes the index dimension
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default().name().to_string(),
            batch_size: 32,
        }
    }
}

/// Paths of the paired index artifacts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub vectors: PathBuf,
    pub metadata: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            vectors: PathBuf::from("data/mayo_vectors.bin"),
            metadata: PathBuf::from("data/mayo_metadata.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl GeneratorConfig {
    /// Resolve the API key from the process environment.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolve the API key through `lookup`. Missing or blank is an error.
    pub fn api_key_with(&self, lookup: impl FnOnce(&str) -> Option<String>) -> Result<String> {
        lookup(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "missing API key: set the {} environment variable",
                    self.api_key_env
                ))
            })
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when it does not
    /// exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be at least 1".to_string()));
        }
        if self.embedding.model != HashingEmbedder::MODEL_NAME {
            self.embedding.model.parse::<ModelKind>()?;
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.generator.model.trim().is_empty() {
            return Err(Error::Config("generator.model cannot be empty".to_string()));
        }
        if !self.generator.base_url.starts_with("http://")
            && !self.generator.base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "generator.base_url must be an http(s) URL, got {}",
                self.generator.base_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path().join("medrag.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.embedding.model, "all-MiniLM-L6-v2");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("medrag.toml");
        fs::write(&path, "[retrieval]\ntop_k = 3\n\n[embedding]\nmodel = \"hashing\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.embedding.model, "hashing");
        assert_eq!(settings.embedding.batch_size, 32);
        assert_eq!(settings.generator, GeneratorConfig::default());
    }

    #[test]
    fn test_validation_failures() {
        let mut settings = Settings::default();
        settings.retrieval.top_k = 0;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        let mut settings = Settings::default();
        settings.embedding.model = "word2vec".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.generator.base_url = "api.openai.com".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("medrag.toml");
        fs::write(&path, "[embedding]\nbatch_size = 0\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn test_api_key_lookup() {
        let config = GeneratorConfig::default();

        let key = config
            .api_key_with(|name| (name == "OPENAI_API_KEY").then(|| " sk-test ".to_string()))
            .unwrap();
        assert_eq!(key, "sk-test");

        assert!(matches!(config.api_key_with(|_| None), Err(Error::Config(_))));
        assert!(config.api_key_with(|_| Some("   ".to_string())).is_err());
    }
}
