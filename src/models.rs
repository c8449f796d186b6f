//! Core data types shared across the catalog, index, and chat pipeline.

use serde::{Deserialize, Serialize};

/// A catalog product as stored in the `products` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Empty ids can occur in externally supplied product lists; the
    /// indexer skips such products.
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

/// Request body for product create/update.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub in_stock: Option<bool>,
}

/// A bounded slice of a knowledge document, the unit of retrieval.
///
/// Ids are deterministic: `<source filename>-<sequence>`.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

/// One entry of a user's append-only conversation log.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub role: ChatRole,
    pub text: String,
    /// `pending` while a reply is being generated, then `replied` or `error`.
    pub status: String,
    /// Server-assigned Unix timestamp (seconds).
    pub created_at: i64,
}
