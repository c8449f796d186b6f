//! Language model provider abstraction.
//!
//! Generation is an opaque capability: `generate(prompt) -> text`. The
//! provider is constructed once at startup with its generation parameters
//! fixed for the process lifetime, and shared behind an `Arc`.
//!
//! [`LlamaServerGenerator`] targets the llama.cpp server `/completion`
//! endpoint, which runs the same GGUF models the storefront was built
//! around. Every call is bounded by the configured timeout; there is no
//! streaming.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;

/// Sampling parameters fixed at provider construction.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl From<&LlmConfig> for GenerationParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stop: config.stop.clone(),
        }
    }
}

/// An opaque text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier for logs.
    fn model_name(&self) -> &str;

    /// Generate a completion for the fully rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the provider named by the configuration.
pub fn create_generator(config: &LlmConfig) -> Result<std::sync::Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(std::sync::Arc::new(DisabledGenerator)),
        "llama-server" => Ok(std::sync::Arc::new(LlamaServerGenerator::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

// ============ Disabled provider ============

/// Always-failing provider for setups without a model.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Language model provider is disabled")
    }
}

// ============ llama.cpp server provider ============

/// Client for a llama.cpp HTTP server.
///
/// Posts `{prompt, n_predict, temperature, stop}` to `<endpoint>/completion`
/// and returns the trimmed `content` field. The reqwest client carries the
/// configured timeout, so a hung inference call fails the chat turn rather
/// than pinning the handler forever.
pub struct LlamaServerGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    params: GenerationParams,
}

impl LlamaServerGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "llama-server".to_string()),
            params: GenerationParams::from(config),
        })
    }
}

#[async_trait]
impl TextGenerator for LlamaServerGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "prompt": prompt,
            "n_predict": self.params.max_tokens,
            "temperature": self.params.temperature,
            "stop": self.params.stop,
        });

        let response = self
            .client
            .post(format!("{}/completion", self.endpoint))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("llama.cpp server error {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        let content = json
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing content"))?;

        Ok(content.trim().to_string())
    }
}
