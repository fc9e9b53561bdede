//! Configuration for the whole answering pipeline.
//!
//! ```toml
//! index_path = "/var/lib/courtside/index.json"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//!
//! [retrieval]
//! top_k = 5
//! min_score = 0.2
//!
//! [context]
//! max_chars = 12000
//!
//! [generation]
//! model = "gpt-4o"
//! temperature = 0.3
//! max_tokens = 1000
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use courtside_documents::BuilderConfig;
use courtside_retrieval::{ContextConfig, EmbeddingConfig, RetrievalConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RagError, Result};
use crate::generation::{GenerationProvider, OpenAIChatProvider};

/// Generation service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,

    /// Base URL for OpenAI-compatible endpoints.
    pub base_url: Option<String>,

    /// Sampling temperature; low values favor consistent phrasing.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,

    /// Bound on one generation call.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: None,
            temperature: 0.3,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Instantiate the configured provider.
    pub fn build_provider(&self) -> Arc<dyn GenerationProvider> {
        let mut provider = OpenAIChatProvider::new()
            .with_model(&self.model)
            .with_timeout(self.timeout());
        if let Some(url) = &self.base_url {
            provider = provider.with_base_url(url);
        }
        Arc::new(provider)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::Config(format!(
                "generation temperature must lie in [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 || self.timeout_secs == 0 {
            return Err(RagError::Config(
                "generation max_tokens and timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Where the vector index is persisted.
    pub index_path: PathBuf,

    pub embedding: EmbeddingConfig,

    pub retrieval: RetrievalConfig,

    pub context: ContextConfig,

    pub generation: GenerationConfig,

    pub documents: BuilderConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_path: Self::data_dir().join("index.json"),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            generation: GenerationConfig::default(),
            documents: BuilderConfig::default(),
        }
    }
}

impl RagConfig {
    /// Default directory for persisted state.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir().unwrap_or_default().join("courtside")
    }

    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("courtside")
            .join("config.toml")
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RagError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path`, or the default location when it exists, or defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => {
                let path = Self::default_path();
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    Self::load(&path).await
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.retrieval
            .validate()
            .and_then(|()| self.context.validate())
            .map_err(|e| RagError::Config(e.to_string()))?;
        self.generation.validate()?;
        if self.embedding.batch_size == 0 {
            return Err(RagError::Config(
                "embedding batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_retrieval::EmbeddingProviderType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.generation.max_tokens, 1000);
        assert!(config.index_path.ends_with("courtside/index.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = RagConfig::from_toml(
            r#"
index_path = "/tmp/courtside/index.json"

[embedding]
provider = "hashing"
batch_timeout_secs = 300

[retrieval]
top_k = 8
"#,
        )
        .unwrap();

        assert_eq!(config.index_path, PathBuf::from("/tmp/courtside/index.json"));
        assert_eq!(config.embedding.provider, EmbeddingProviderType::Hashing);
        assert_eq!(config.embedding.batch_timeout(), Duration::from_secs(300));
        assert_eq!(config.embedding.request_timeout_secs, 30);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.min_score, RetrievalConfig::default().min_score);
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for toml in [
            "[retrieval]\ntop_k = 0",
            "[retrieval]\nmin_score = 2.0",
            "[context]\nmax_chars = 10",
            "[generation]\ntemperature = 5.0",
            "[embedding]\nbatch_size = 0",
            "index_path = [",
        ] {
            assert!(
                matches!(RagConfig::from_toml(toml), Err(RagError::Config(_))),
                "accepted: {toml}"
            );
        }
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[context]\nmax_chars = 4000\n")
            .await
            .unwrap();

        let config = RagConfig::load_or_default(Some(&path)).await.unwrap();
        assert_eq!(config.context.max_chars, 4000);
    }
}
