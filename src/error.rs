//! Error taxonomy for the chat pipeline.
//!
//! Retrieval-layer failures ([`crate::store::StoreError`]) are swallowed by
//! the orchestrator and degrade to an empty context segment. The errors
//! here are the ones that reach the request boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The user utterance was blank. Rejected before any side effect.
    #[error("message must not be empty")]
    EmptyInput,

    /// The language model call failed or timed out. The user message
    /// persisted before generation is retained.
    #[error("text generation failed: {0}")]
    Generation(String),

    /// The conversation log could not be written.
    #[error("conversation log write failed: {0}")]
    Persistence(#[from] sqlx::Error),
}
