//! Vector index store: named collections of embedded entries with
//! nearest-neighbor query and exact-match metadata filtering.
//!
//! Two implementations: [`SqliteStore`] (persistent, embedding BLOBs,
//! brute-force cosine scoring in Rust) and [`MemoryStore`] (RwLock maps,
//! used by the test suite).
//!
//! Ranking is ascending cosine distance with ties broken by id, so query
//! output is fully deterministic for a given index state.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

/// Exact-match conjunction over metadata fields.
pub type MetadataFilter = serde_json::Map<String, serde_json::Value>;

/// Retrieval-layer failures. Callers treat both variants as non-fatal
/// and degrade to an empty context segment.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing store unreachable, or the collection does not exist.
    #[error("index unavailable: {0}")]
    Unavailable(String),

    /// The embedding provider could not embed the text.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// An entry to be indexed. The store computes the embedding from `text`.
#[derive(Debug, Clone)]
pub struct IndexItem {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A ranked query result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Cosine distance to the query; lower is closer.
    pub distance: f32,
}

/// A named-collection vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if absent; idempotent.
    async fn create_or_open(&self, name: &str) -> Result<(), StoreError>;

    /// Embed and store the items, replacing entries with colliding ids.
    /// Creates the collection if needed.
    async fn upsert(&self, collection: &str, items: &[IndexItem]) -> Result<(), StoreError>;

    /// Return up to `k` entries ranked by ascending embedding distance to
    /// `query_text`, optionally restricted to entries whose metadata
    /// matches every field of `filter`.
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, StoreError>;

    /// Number of entries in the collection.
    async fn count(&self, collection: &str) -> Result<i64, StoreError>;

    /// Delete the collection and its entries; no-op if absent.
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Names of all collections, sorted.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;
}

/// True when every field of `filter` is present in `metadata` with an
/// equal value.
pub(crate) fn matches_filter(
    metadata: &serde_json::Map<String, serde_json::Value>,
    filter: &MetadataFilter,
) -> bool {
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}

/// Ascending distance, then ascending id for equal distances.
pub(crate) fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn filter_is_conjunction() {
        let m = meta(&[
            ("gender", json!("male")),
            ("category", json!("Fashion")),
            ("in_stock", json!(true)),
        ]);

        assert!(matches_filter(&m, &meta(&[("gender", json!("male"))])));
        assert!(matches_filter(
            &m,
            &meta(&[("gender", json!("male")), ("in_stock", json!(true))])
        ));
        assert!(!matches_filter(
            &m,
            &meta(&[("gender", json!("male")), ("category", json!("Sports"))])
        ));
        assert!(!matches_filter(&m, &meta(&[("color", json!("red"))])));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let m = meta(&[("gender", json!("female"))]);
        assert!(matches_filter(&m, &MetadataFilter::new()));
    }

    #[test]
    fn equal_distances_break_ties_by_id() {
        let mut hits = vec![
            SearchHit {
                id: "b".into(),
                text: String::new(),
                metadata: Default::default(),
                distance: 0.5,
            },
            SearchHit {
                id: "a".into(),
                text: String::new(),
                metadata: Default::default(),
                distance: 0.5,
            },
            SearchHit {
                id: "c".into(),
                text: String::new(),
                metadata: Default::default(),
                distance: 0.1,
            },
        ];
        sort_hits(&mut hits);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
