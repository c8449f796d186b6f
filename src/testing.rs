//! Deterministic test doubles for the embedding and generation providers.
//!
//! Shared between unit tests and the integration suite; not part of the
//! public API surface.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::llm::TextGenerator;

const DIMS: usize = 64;

/// Embeds text as an L2-normalized bag-of-tokens histogram, with token
/// positions chosen by FNV-1a. Texts sharing tokens land close together,
/// which is all the retrieval tests need, and the output is fully
/// deterministic across runs and platforms.
pub struct TokenHashEmbedder;

impl TokenHashEmbedder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TokenHashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

fn embed_one(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        v[(fnv1a(token) % DIMS as u64) as usize] += 1.0;
    }

    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl Embedder for TokenHashEmbedder {
    fn model_name(&self) -> &str {
        "token-hash"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed_one(t)).collect())
    }
}

/// An embedder that always fails, for exercising degraded retrieval.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("embedder down")
    }
}

/// Returns a canned reply and records every prompt it was handed, so
/// tests can assert on the exact prompt the chat handler built.
pub struct RecordingGenerator {
    reply: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            bail!("model crashed")
        }
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_hash_is_deterministic_and_normalized() {
        let e = TokenHashEmbedder::new();
        let a = e.embed(&["yoga mat".to_string()]).await.unwrap();
        let b = e.embed(&["yoga mat".to_string()]).await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_tokens_are_closer_than_disjoint() {
        use crate::embedding::cosine_distance;
        let e = TokenHashEmbedder::new();
        let vs = e
            .embed(&[
                "eco friendly yoga mat".to_string(),
                "yoga mat".to_string(),
                "bluetooth speaker".to_string(),
            ])
            .await
            .unwrap();
        assert!(cosine_distance(&vs[0], &vs[1]) < cosine_distance(&vs[0], &vs[2]));
    }
}
