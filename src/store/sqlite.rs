//! SQLite-backed [`VectorStore`] implementation.
//!
//! Collections and entries live in two tables; embeddings are stored as
//! little-endian f32 BLOBs. Queries load the collection's vectors and
//! score cosine distance in Rust, which is exact and fast enough for
//! catalog- and docs-sized collections.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_distance, embed_query, vec_to_blob, Embedder};

use super::{matches_filter, sort_hits, IndexItem, MetadataFilter, SearchHit, StoreError, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Self {
        Self { pool, embedder }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM vector_collections WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn create_or_open(&self, name: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO vector_collections (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, items: &[IndexItem]) -> Result<(), StoreError> {
        self.create_or_open(collection).await?;
        if items.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = items.iter().map(|i| i.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        for (item, vector) in items.iter().zip(vectors) {
            let metadata_json = serde_json::Value::Object(item.metadata.clone()).to_string();
            sqlx::query(
                r#"
                INSERT INTO vector_entries (collection, id, text, metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    text = excluded.text,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding
                "#,
            )
            .bind(collection)
            .bind(&item.id)
            .bind(&item.text)
            .bind(&metadata_json)
            .bind(vec_to_blob(&vector))
            .execute(&self.pool)
            .await?;
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
        if !self.collection_exists(collection).await? {
            return Err(StoreError::Unavailable(format!(
                "no such collection: {}",
                collection
            )));
        }

        let query_vec = embed_query(self.embedder.as_ref(), query_text)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;

        let rows = sqlx::query(
            "SELECT id, text, metadata_json, embedding FROM vector_entries WHERE collection = ?",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let metadata_json: String = row.get("metadata_json");
            let metadata = serde_json::from_str::<serde_json::Value>(&metadata_json)
                .ok()
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();

            if let Some(f) = filter {
                if !matches_filter(&metadata, f) {
                    continue;
                }
            }

            let blob: Vec<u8> = row.get("embedding");
            hits.push(SearchHit {
                id: row.get("id"),
                text: row.get("text"),
                metadata,
                distance: cosine_distance(&query_vec, &blob_to_vec(&blob)),
            });
        }

        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<i64, StoreError> {
        if !self.collection_exists(collection).await? {
            return Err(StoreError::Unavailable(format!(
                "no such collection: {}",
                collection
            )));
        }

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM vector_entries WHERE collection = ?")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM vector_entries WHERE collection = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM vector_collections WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM vector_collections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }
}
