//! # Storebot
//!
//! A RAG-backed shopping assistant for an e-commerce storefront: product
//! catalog search, general-document retrieval, and local-LLM chat behind
//! one HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  ┌───────────┐   ┌─────────────┐
//! │ Catalog  │  │ Docs dir  │──▶│ Chunk+Embed │
//! │ (SQLite) │  │ (.md/.txt)│   └──────┬──────┘
//! └────┬─────┘  └───────────┘          │
//!      │ reindex on write              ▼
//!      │                     ┌──────────────────┐
//!      └────────────────────▶│  Vector Store    │
//!                            │ products / docs  │
//!                            └────────┬─────────┘
//!                                     │ get_context
//!                  ┌──────────┐  ┌────┴──────┐   ┌───────────┐
//!  POST /api/chat ▶│ Chat turn│─▶│ Retrieval │──▶│ LLM       │
//!                  │ handler  │  │orchestrator│  │ provider  │
//!                  └────┬─────┘  └───────────┘   └───────────┘
//!                       ▼
//!                 conversation log (SQLite)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping fixed-size text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector index store (SQLite + in-memory) |
//! | [`catalog`] | Product CRUD |
//! | [`product_index`] | Catalog indexer with generation swap |
//! | [`docs`] | Knowledge-document ingestion |
//! | [`filters`] | Utterance → metadata-filter strategies |
//! | [`retrieval`] | Context assembly |
//! | [`llm`] | Language model provider |
//! | [`chat`] | Chat turn handler + conversation log |
//! | [`app`] | Application context wiring |
//! | [`server`] | HTTP API |

pub mod app;
pub mod catalog;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod docs;
pub mod embedding;
pub mod error;
pub mod filters;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod product_index;
pub mod retrieval;
pub mod server;
pub mod store;
pub mod testing;
