//! In-memory [`VectorStore`] implementation.
//!
//! `HashMap` collections behind `std::sync::RwLock`; vector search is
//! brute-force cosine distance over all stored entries. Used by the test
//! suite and useful for ephemeral setups.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embedding::{cosine_distance, embed_query, Embedder};

use super::{matches_filter, sort_hits, IndexItem, MetadataFilter, SearchHit, StoreError, VectorStore};

struct StoredEntry {
    text: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    vector: Vec<f32>,
}

pub struct MemoryStore {
    embedder: Arc<dyn Embedder>,
    collections: RwLock<HashMap<String, HashMap<String, StoredEntry>>>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, HashMap<String, StoredEntry>>>, StoreError>
    {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, HashMap<String, StoredEntry>>>, StoreError>
    {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn create_or_open(&self, name: &str) -> Result<(), StoreError> {
        self.write()?.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, collection: &str, items: &[IndexItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            self.create_or_open(collection).await?;
            return Ok(());
        }

        let texts: Vec<String> = items.iter().map(|i| i.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let mut guard = self.write()?;
        let entries = guard.entry(collection.to_string()).or_default();
        for (item, vector) in items.iter().zip(vectors) {
            entries.insert(
                item.id.clone(),
                StoredEntry {
                    text: item.text.clone(),
                    metadata: item.metadata.clone(),
                    vector,
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, StoreError> {
        // Embed before taking the lock; the provider call can be slow.
        let query_vec = embed_query(self.embedder.as_ref(), query_text)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let guard = self.read()?;
        let entries = guard
            .get(collection)
            .ok_or_else(|| StoreError::Unavailable(format!("no such collection: {}", collection)))?;

        let mut hits: Vec<SearchHit> = entries
            .iter()
            .filter(|(_, e)| filter.is_none_or(|f| matches_filter(&e.metadata, f)))
            .map(|(id, e)| SearchHit {
                id: id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                distance: cosine_distance(&query_vec, &e.vector),
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<i64, StoreError> {
        let guard = self.read()?;
        guard
            .get(collection)
            .map(|entries| entries.len() as i64)
            .ok_or_else(|| StoreError::Unavailable(format!("no such collection: {}", collection)))
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.write()?.remove(name);
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TokenHashEmbedder;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(TokenHashEmbedder::new()))
    }

    fn item(id: &str, text: &str, gender: Option<&str>) -> IndexItem {
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".to_string(), json!(text));
        if let Some(g) = gender {
            metadata.insert("gender".to_string(), json!(g));
        }
        IndexItem {
            id: id.to_string(),
            text: text.to_string(),
            metadata,
        }
    }

    #[tokio::test]
    async fn upsert_then_count() {
        let s = store();
        s.upsert("products", &[item("1", "yoga mat", None), item("2", "smart watch", None)])
            .await
            .unwrap();
        assert_eq!(s.count("products").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn upsert_same_id_replaces() {
        let s = store();
        s.upsert("products", &[item("1", "yoga mat", None)]).await.unwrap();
        s.upsert("products", &[item("1", "updated yoga mat", None)])
            .await
            .unwrap();
        assert_eq!(s.count("products").await.unwrap(), 1);
        let hits = s.query("products", "yoga", 5, None).await.unwrap();
        assert_eq!(hits[0].text, "updated yoga mat");
    }

    #[tokio::test]
    async fn query_ranks_by_distance() {
        let s = store();
        s.upsert(
            "products",
            &[
                item("1", "eco friendly yoga mat", None),
                item("2", "bluetooth speaker with bass", None),
            ],
        )
        .await
        .unwrap();

        let hits = s.query("products", "yoga mat", 2, None).await.unwrap();
        assert_eq!(hits[0].id, "1");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn query_applies_metadata_filter() {
        let s = store();
        s.upsert(
            "products",
            &[
                item("1", "running shoes", Some("male")),
                item("2", "running shoes", Some("female")),
            ],
        )
        .await
        .unwrap();

        let mut filter = MetadataFilter::new();
        filter.insert("gender".to_string(), json!("female"));
        let hits = s
            .query("products", "running shoes", 5, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");
    }

    #[tokio::test]
    async fn identical_entries_tie_break_by_id() {
        let s = store();
        s.upsert(
            "products",
            &[
                item("b", "cotton t-shirt", None),
                item("a", "cotton t-shirt", None),
            ],
        )
        .await
        .unwrap();

        let hits = s.query("products", "cotton t-shirt", 5, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn query_missing_collection_is_unavailable() {
        let s = store();
        let err = s.query("nope", "anything", 3, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn delete_collection_is_idempotent() {
        let s = store();
        s.upsert("products", &[item("1", "yoga mat", None)]).await.unwrap();
        s.delete_collection("products").await.unwrap();
        s.delete_collection("products").await.unwrap();
        assert!(s.count("products").await.is_err());
    }

    #[tokio::test]
    async fn list_collections_sorted() {
        let s = store();
        s.create_or_open("local_docs").await.unwrap();
        s.create_or_open("products_v1").await.unwrap();
        assert_eq!(
            s.list_collections().await.unwrap(),
            vec!["local_docs".to_string(), "products_v1".to_string()]
        );
    }
}
