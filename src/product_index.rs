//! Product catalog indexer.
//!
//! Maintains the vector collection behind product retrieval. Rebuilds are
//! full, never incremental: a new generation collection (`products_v<N>`)
//! is populated from the complete catalog, the active pointer is swapped,
//! and superseded generations are deleted. Readers therefore observe
//! either the fully-old or fully-new index. A query racing the cleanup
//! of its (stale) generation gets `Unavailable` and degrades to an empty
//! product context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::json;
use tracing::{info, warn};

use crate::models::Product;
use crate::store::{IndexItem, MetadataFilter, SearchHit, StoreError, VectorStore};

const GENERATION_PREFIX: &str = "products_v";

pub struct ProductIndex {
    store: Arc<dyn VectorStore>,
    active: RwLock<Option<String>>,
    generation: AtomicU64,
}

impl ProductIndex {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            active: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Name of the collection queries currently run against.
    pub fn active_collection(&self) -> Option<String> {
        self.active.read().ok().and_then(|guard| guard.clone())
    }

    /// Full rebuild: populate a fresh generation, swap it in, then drop
    /// superseded generations. Returns the number of products indexed.
    pub async fn rebuild(&self, products: &[Product]) -> Result<usize, StoreError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("{}{}", GENERATION_PREFIX, generation);

        self.store.create_or_open(&name).await?;

        let items: Vec<IndexItem> = products.iter().filter_map(product_to_item).collect();
        let skipped = products.len() - items.len();
        if skipped > 0 {
            warn!(skipped, "skipping products without a resolvable id");
        }

        if let Err(e) = self.store.upsert(&name, &items).await {
            // Leave the previous generation active; drop the partial one.
            let _ = self.store.delete_collection(&name).await;
            return Err(e);
        }

        let previous = {
            let mut guard = self
                .active
                .write()
                .map_err(|_| StoreError::Unavailable("index pointer lock poisoned".into()))?;
            guard.replace(name.clone())
        };

        if let Some(old) = previous {
            if let Err(e) = self.store.delete_collection(&old).await {
                warn!(collection = %old, error = %e, "failed to drop superseded product index");
            }
        }
        // Generations left behind by earlier process runs.
        if let Ok(collections) = self.store.list_collections().await {
            for stale in collections
                .iter()
                .filter(|c| c.starts_with(GENERATION_PREFIX) && **c != name)
            {
                let _ = self.store.delete_collection(stale).await;
            }
        }

        info!(collection = %name, products = items.len(), "product index rebuilt");
        Ok(items.len())
    }

    /// Rebuild when forced or when nothing usable is indexed yet;
    /// otherwise keep the existing (possibly stale) generation.
    pub async fn ensure_built(&self, products: &[Product], force: bool) -> Result<(), StoreError> {
        if !force {
            if let Some(active) = self.active_collection() {
                if matches!(self.store.count(&active).await, Ok(n) if n > 0) {
                    return Ok(());
                }
            }
        }
        self.rebuild(products).await.map(|_| ())
    }

    /// Query the active generation.
    pub async fn query(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let collection = self
            .active_collection()
            .ok_or_else(|| StoreError::Unavailable("product index not built".into()))?;
        self.store.query(&collection, query_text, k, filter).await
    }

    /// Entries in the active generation.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let collection = self
            .active_collection()
            .ok_or_else(|| StoreError::Unavailable("product index not built".into()))?;
        self.store.count(&collection).await
    }
}

/// Indexable text is the pipe-joined name, category, and description;
/// metadata carries the fields the context renderer and filters need.
/// Products without an id cannot be referenced later and are skipped.
fn product_to_item(product: &Product) -> Option<IndexItem> {
    if product.id.trim().is_empty() {
        return None;
    }

    let text = [
        product.name.trim(),
        product.category.trim(),
        product.description.trim(),
    ]
    .join(" | ");

    let mut metadata = serde_json::Map::new();
    metadata.insert("name".to_string(), json!(product.name));
    metadata.insert("category".to_string(), json!(product.category));
    metadata.insert("price".to_string(), json!(product.price));
    if let Some(image) = &product.image {
        metadata.insert("image".to_string(), json!(image));
    }
    if let Some(gender) = &product.gender {
        metadata.insert("gender".to_string(), json!(gender));
    }
    if let Some(color) = &product.color {
        metadata.insert("color".to_string(), json!(color));
    }
    if let Some(in_stock) = product.in_stock {
        metadata.insert("in_stock".to_string(), json!(in_stock));
    }

    Some(IndexItem {
        id: product.id.clone(),
        text,
        metadata,
    })
}
