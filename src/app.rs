//! Process-wide application context.
//!
//! All singleton state (config, database pool, embedding provider,
//! vector store, product index, filter strategy, language model) is
//! built here in a fixed order: embeddings, then stores, then the model.
//! Request handlers receive it by injection behind an `Arc`; nothing in
//! the crate mutates globals. The only interior mutability is the
//! product index's atomically swapped collection pointer.

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::catalog;
use crate::config::Config;
use crate::db;
use crate::docs;
use crate::embedding::{create_embedder, Embedder};
use crate::filters::{FilterStrategy, KeywordFilter};
use crate::llm::{create_generator, TextGenerator};
use crate::migrate;
use crate::product_index::ProductIndex;
use crate::store::{SqliteStore, VectorStore};

pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub product_index: ProductIndex,
    pub filter: Arc<dyn FilterStrategy>,
    pub generator: Arc<dyn TextGenerator>,
}

impl AppContext {
    /// Full startup sequence: connect and migrate the database, build the
    /// embedding provider, open the vector store, ingest docs if the
    /// collection is empty, force-rebuild the product index from the
    /// catalog, and finally construct the language model provider.
    ///
    /// Index build failures are logged and tolerated; retrieval degrades
    /// to an empty context rather than refusing to boot.
    pub async fn initialize(config: Config) -> Result<Arc<Self>> {
        let pool = db::connect(&config.db).await?;
        migrate::run_migrations(&pool).await?;

        let embedder = create_embedder(&config.embedding)?;
        info!(model = embedder.model_name(), "embedding provider ready");

        let store: Arc<dyn VectorStore> = Arc::new(SqliteStore::new(pool.clone(), embedder.clone()));

        if let Err(e) =
            docs::build_docs_index_if_missing(store.as_ref(), &config.docs, &config.chunking, false)
                .await
        {
            error!(error = %e, "docs index build failed; document retrieval degraded");
        }

        let product_index = ProductIndex::new(store.clone());
        let products = catalog::list_products(&pool).await?;
        if let Err(e) = product_index.ensure_built(&products, true).await {
            error!(error = %e, "startup product reindex failed; product retrieval degraded");
        }

        let generator = create_generator(&config.llm)?;
        info!(model = generator.model_name(), "language model provider ready");

        Ok(Arc::new(Self {
            config,
            pool,
            embedder,
            store,
            product_index,
            filter: Arc::new(KeywordFilter::gender()),
            generator,
        }))
    }

    /// Assemble a context from pre-built parts. No migrations, ingest, or
    /// startup reindex; the caller controls every component. Used by the
    /// test suites.
    pub fn with_parts(
        config: Config,
        pool: SqlitePool,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            pool,
            embedder,
            store: store.clone(),
            product_index: ProductIndex::new(store),
            filter: Arc::new(KeywordFilter::gender()),
            generator,
        })
    }

    /// Post-mutation hook: synchronously rebuild the product index from
    /// the current catalog. A failure leaves the previous generation
    /// active and is logged, never surfaced to the mutating caller: the
    /// catalog write has already succeeded.
    pub async fn on_catalog_mutation(&self) {
        match self.reindex().await {
            Ok(count) => info!(products = count, "product index refreshed after catalog mutation"),
            Err(e) => {
                error!(error = %e, "product reindex failed after catalog mutation; index is stale")
            }
        }
    }

    /// Full product reindex from the catalog; propagates failures.
    pub async fn reindex(&self) -> Result<usize> {
        let products = catalog::list_products(&self.pool).await?;
        let count = self.product_index.rebuild(&products).await?;
        Ok(count)
    }
}
