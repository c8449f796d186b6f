use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded from a TOML file.
///
/// Every section has sensible defaults so a sparse config file (or an
/// empty one) yields a runnable development setup.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub db: DbConfig,
    pub docs: DocsConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/storebot.sqlite"),
        }
    }
}

/// Where the general knowledge documents live and which files to index.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DocsConfig {
    pub root: PathBuf,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("rag/docs"),
            include_globs: vec!["**/*.md".to_string(), "**/*.txt".to_string()],
            exclude_globs: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks. Must be < chunk_size.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Top-k for product catalog retrieval.
    pub product_top_k: usize,
    /// Top-k for general document retrieval.
    pub doc_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            product_top_k: 8,
            doc_top_k: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `local`, `openai`, or `disabled`.
    pub provider: String,
    pub model: String,
    /// Vector dimensionality. Resolved from the model name when absent.
    pub dims: Option<usize>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: "bge-small-en-v1.5".to_string(),
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// `llama-server` or `disabled`.
    pub provider: String,
    /// Base URL of a llama.cpp server (e.g. `http://127.0.0.1:8080`).
    pub endpoint: String,
    /// Informational model identifier reported in logs.
    pub model: Option<String>,
    pub context_window: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Stop sequences marking end-of-turn.
    pub stop: Vec<String>,
    /// Hard ceiling on a single inference call.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "llama-server".to_string(),
            endpoint: "http://127.0.0.1:8080".to_string(),
            model: None,
            context_window: 4096,
            max_tokens: 512,
            temperature: 0.6,
            stop: vec!["</s>".to_string(), "[INST]".to_string()],
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7410".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    if config.retrieval.product_top_k == 0 || config.retrieval.doc_top_k == 0 {
        anyhow::bail!("retrieval top-k values must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "local" | "openai" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, or disabled.",
            other
        ),
    }

    match config.llm.provider.as_str() {
        "llama-server" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be llama-server or disabled.",
            other
        ),
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }
    if config.llm.max_tokens == 0 {
        anyhow::bail!("llm.max_tokens must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 120);
        assert_eq!(config.retrieval.product_top_k, 8);
        assert_eq!(config.retrieval.doc_top_k, 4);
        assert_eq!(config.embedding.model, "bge-small-en-v1.5");
        assert_eq!(config.llm.max_tokens, 512);
        assert_eq!(config.llm.stop, vec!["</s>", "[INST]"]);
        validate(&config).unwrap();
    }

    #[test]
    fn partial_section_overrides() {
        let config: Config = toml::from_str(
            r#"
[chunking]
chunk_size = 400

[retrieval]
doc_top_k = 2
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.overlap, 120);
        assert_eq!(config.retrieval.doc_top_k, 2);
        assert_eq!(config.retrieval.product_top_k, 8);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let config: Config = toml::from_str(
            r#"
[chunking]
chunk_size = 100
overlap = 100
"#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_providers_rejected() {
        let config: Config = toml::from_str("[embedding]\nprovider = \"cohere\"").unwrap();
        assert!(validate(&config).is_err());

        let config: Config = toml::from_str("[llm]\nprovider = \"bedrock\"").unwrap();
        assert!(validate(&config).is_err());
    }
}
