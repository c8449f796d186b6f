//! Knowledge-document ingestion.
//!
//! Walks the configured docs directory, chunks each matching file, and
//! indexes the chunks into the `local_docs` collection. Chunk ids are
//! deterministic (`<filename>-<seq>`), so re-ingesting the same tree is
//! an upsert, not a duplication. The collection is only built when empty
//! unless forced; there is no incremental re-chunking.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::json;
use tracing::info;
use walkdir::WalkDir;

use crate::chunk::chunk;
use crate::config::{ChunkingConfig, DocsConfig};
use crate::models::DocumentChunk;
use crate::store::{IndexItem, VectorStore};

/// Collection holding the general (non-catalog) retrieval corpus.
pub const DOCS_COLLECTION: &str = "local_docs";

/// Build the docs index if it is empty (or unconditionally with `force`).
/// Returns the number of chunks indexed, 0 when the build was skipped.
pub async fn build_docs_index_if_missing(
    store: &dyn VectorStore,
    docs: &DocsConfig,
    chunking: &ChunkingConfig,
    force: bool,
) -> Result<usize> {
    if force {
        store.delete_collection(DOCS_COLLECTION).await?;
    }
    store.create_or_open(DOCS_COLLECTION).await?;

    if !force && store.count(DOCS_COLLECTION).await? > 0 {
        return Ok(0);
    }

    let chunks = scan_docs(docs, chunking)?;
    let items: Vec<IndexItem> = chunks
        .iter()
        .map(|c| IndexItem {
            id: c.id.clone(),
            text: c.text.clone(),
            metadata: [("source".to_string(), json!(c.source))].into_iter().collect(),
        })
        .collect();

    store
        .upsert(DOCS_COLLECTION, &items)
        .await
        .map_err(|e| anyhow::anyhow!("failed to index document chunks: {}", e))?;

    info!(chunks = items.len(), "docs index built");
    Ok(items.len())
}

/// Read and chunk every matching file under the docs root, in
/// deterministic (path-sorted) order. A missing root yields no chunks
/// rather than an error so a fresh checkout still boots.
pub fn scan_docs(docs: &DocsConfig, chunking: &ChunkingConfig) -> Result<Vec<DocumentChunk>> {
    if !docs.root.exists() {
        return Ok(Vec::new());
    }

    let include_set = build_globset(&docs.include_globs)?;
    let exclude_set = build_globset(&docs.exclude_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&docs.root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(&docs.root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((rel_str, path.to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = Vec::new();
    for (rel, path) in files {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(rel.clone());

        for (seq, piece) in chunk(&text, chunking.chunk_size, chunking.overlap)?
            .into_iter()
            .enumerate()
        {
            out.push(DocumentChunk {
                id: format!("{}-{}", filename, seq),
                text: piece,
                source: filename.clone(),
            });
        }
    }

    Ok(out)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
