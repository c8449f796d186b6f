//! Retrieval orchestrator.
//!
//! Builds the single context blob handed to the language model: a
//! product-catalog section (semantic search over the product index, with
//! optional metadata filtering) and a general-document section (top
//! chunks from the docs collection). Either sub-retrieval failing leaves
//! its section empty; retrieval errors never fail a chat turn.

use tracing::warn;

use crate::app::AppContext;
use crate::docs::DOCS_COLLECTION;
use crate::store::{SearchHit, VectorStore};

pub const PRODUCT_HEADER: &str = "Product Catalog Context:";
pub const DOCS_HEADER: &str = "Other Info Context:";

/// Assemble the full retrieval context for a user utterance. Both
/// labeled sections are always present; deterministic for a fixed index
/// state and query.
pub async fn get_context(ctx: &AppContext, utterance: &str) -> String {
    let product_section = product_context(ctx, utterance).await;
    let docs_section = document_context(ctx, utterance).await;

    format!(
        "{}\n{}\n\n{}\n{}",
        PRODUCT_HEADER, product_section, DOCS_HEADER, docs_section
    )
}

/// Product retrieval with filter fallback: a filtered query returning
/// nothing is retried unfiltered, so a filter can narrow results but
/// never erase them.
async fn product_context(ctx: &AppContext, utterance: &str) -> String {
    let k = ctx.config.retrieval.product_top_k;
    let filter = ctx.filter.extract(utterance);

    let first = ctx
        .product_index
        .query(utterance, k, filter.as_ref())
        .await;

    let hits = match first {
        Ok(hits) if hits.is_empty() && filter.is_some() => {
            match ctx.product_index.query(utterance, k, None).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(error = %e, "product retrieval failed; returning empty product context");
                    return String::new();
                }
            }
        }
        Ok(hits) => hits,
        Err(e) => {
            warn!(error = %e, "product retrieval failed; returning empty product context");
            return String::new();
        }
    };

    hits.iter()
        .map(render_product_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One product per line, from the hit's metadata.
fn render_product_line(hit: &SearchHit) -> String {
    let get_str = |key: &str| {
        hit.metadata
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    let price = hit
        .metadata
        .get("price")
        .map(|v| v.to_string())
        .unwrap_or_default();

    let mut line = format!(
        "- {} | {} | price: {}",
        get_str("name"),
        get_str("category"),
        price
    );

    for key in ["gender", "color"] {
        let value = get_str(key);
        if !value.is_empty() {
            line.push_str(&format!(" | {}: {}", key, value));
        }
    }
    if let Some(in_stock) = hit.metadata.get("in_stock").and_then(|v| v.as_bool()) {
        line.push_str(if in_stock {
            " | in stock"
        } else {
            " | out of stock"
        });
    }

    line
}

/// General-document retrieval: chunk texts joined by blank lines.
async fn document_context(ctx: &AppContext, utterance: &str) -> String {
    let k = ctx.config.retrieval.doc_top_k;
    match ctx.store.query(DOCS_COLLECTION, utterance, k, None).await {
        Ok(hits) => hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
        Err(e) => {
            warn!(error = %e, "document retrieval failed; returning empty docs context");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppContext;
    use crate::config::Config;
    use crate::db;
    use crate::migrate;
    use crate::models::Product;
    use crate::store::{IndexItem, MemoryStore, VectorStore};
    use crate::testing::{RecordingGenerator, TokenHashEmbedder};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_ctx() -> (TempDir, Arc<AppContext>) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.db.path = tmp.path().join("app.sqlite");
        let pool = db::connect(&config.db).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();

        let embedder = Arc::new(TokenHashEmbedder::new());
        let store = Arc::new(MemoryStore::new(embedder.clone()));
        let generator = Arc::new(RecordingGenerator::replying("ok"));
        (
            tmp,
            AppContext::with_parts(config, pool, embedder, store, generator),
        )
    }

    fn product(id: &str, name: &str, category: &str, price: f64, gender: Option<&str>) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price,
            category: category.to_string(),
            description: format!("{} description", name),
            image: None,
            gender: gender.map(String::from),
            color: None,
            in_stock: None,
        }
    }

    async fn index_docs(ctx: &AppContext, chunks: &[(&str, &str)]) {
        let items: Vec<IndexItem> = chunks
            .iter()
            .map(|(id, text)| IndexItem {
                id: id.to_string(),
                text: text.to_string(),
                metadata: [("source".to_string(), json!("faq.md"))].into_iter().collect(),
            })
            .collect();
        ctx.store.upsert(DOCS_COLLECTION, &items).await.unwrap();
    }

    #[tokio::test]
    async fn context_contains_product_line() {
        let (_tmp, ctx) = test_ctx().await;
        ctx.product_index
            .rebuild(&[product("p1", "Yoga Mat", "Sports & Outdoors", 69.90, None)])
            .await
            .unwrap();
        ctx.store.create_or_open(DOCS_COLLECTION).await.unwrap();

        let context = get_context(&ctx, "do you have a yoga mat").await;
        let product_line = context
            .lines()
            .find(|l| l.contains("Yoga Mat"))
            .expect("product line present");
        assert!(product_line.contains("69.9"));
        assert!(context.starts_with(PRODUCT_HEADER));
        assert!(context.contains(DOCS_HEADER));
    }

    #[tokio::test]
    async fn unavailable_product_index_leaves_section_empty() {
        let (_tmp, ctx) = test_ctx().await;
        // Product index never built; docs healthy.
        index_docs(
            &ctx,
            &[("faq.md-0", "We ship orders within two business days.")],
        )
        .await;

        let context = get_context(&ctx, "how fast is shipping").await;
        let product_section = context
            .split(DOCS_HEADER)
            .next()
            .unwrap()
            .trim_start_matches(PRODUCT_HEADER)
            .trim();
        assert!(product_section.is_empty());
        assert!(context.contains("two business days"));
    }

    #[tokio::test]
    async fn gender_filter_falls_back_when_nothing_matches() {
        let (_tmp, ctx) = test_ctx().await;
        // No product carries gender metadata, so the filtered query is empty.
        ctx.product_index
            .rebuild(&[
                product("p1", "Running Shoes", "Fashion", 129.0, None),
                product("p2", "Leather Wallet", "Fashion", 59.0, None),
            ])
            .await
            .unwrap();
        ctx.store.create_or_open(DOCS_COLLECTION).await.unwrap();

        let gendered = get_context(&ctx, "running shoes for men").await;
        assert!(gendered.contains("Running Shoes"));
    }

    #[tokio::test]
    async fn gender_filter_restricts_when_products_match() {
        let (_tmp, ctx) = test_ctx().await;
        ctx.product_index
            .rebuild(&[
                product("p1", "Running Shoes", "Fashion", 129.0, Some("male")),
                product("p2", "Running Shoes", "Fashion", 119.0, Some("female")),
            ])
            .await
            .unwrap();
        ctx.store.create_or_open(DOCS_COLLECTION).await.unwrap();

        let context = get_context(&ctx, "running shoes for women").await;
        assert!(context.contains("gender: female"));
        assert!(!context.contains("gender: male"));
    }

    #[tokio::test]
    async fn doc_chunks_joined_with_blank_lines() {
        let (_tmp, ctx) = test_ctx().await;
        ctx.product_index.rebuild(&[]).await.unwrap();
        index_docs(
            &ctx,
            &[
                ("faq.md-0", "Returns are free within thirty days."),
                ("faq.md-1", "Refunds are processed back to the original payment method."),
            ],
        )
        .await;

        let context = get_context(&ctx, "returns refunds payment").await;
        let docs_section = context.split(DOCS_HEADER).nth(1).unwrap();
        assert!(docs_section.contains("\n\n"));
        assert!(docs_section.contains("thirty days"));
        assert!(docs_section.contains("original payment method"));
    }

    #[test]
    fn product_line_includes_stock_and_color() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".to_string(), json!("Cotton T-Shirt"));
        metadata.insert("category".to_string(), json!("Fashion"));
        metadata.insert("price".to_string(), json!(29.9));
        metadata.insert("color".to_string(), json!("navy"));
        metadata.insert("in_stock".to_string(), json!(false));

        let line = render_product_line(&SearchHit {
            id: "p1".into(),
            text: String::new(),
            metadata,
            distance: 0.0,
        });
        assert_eq!(
            line,
            "- Cotton T-Shirt | Fashion | price: 29.9 | color: navy | out of stock"
        );
    }
}
