//! HTTP API.
//!
//! | Method   | Path                  | Description                          |
//! |----------|-----------------------|--------------------------------------|
//! | `POST`   | `/api/chat`           | Run one chat turn                    |
//! | `GET`    | `/api/chat/history`   | Caller's conversation log            |
//! | `GET`    | `/api/products`       | List the catalog                     |
//! | `POST`   | `/api/products`       | Create a product (reindexes)         |
//! | `PUT`    | `/api/products/{id}`  | Update a product (reindexes)         |
//! | `DELETE` | `/api/products/{id}`  | Delete a product (reindexes)         |
//! | `GET`    | `/health`             | Liveness + version                   |
//!
//! Identity is an opaque `x-user-id` header supplied by the fronting
//! auth layer; requests to chat endpoints without it get 401. Errors are
//! `{"error": "..."}` with 400 (empty input), 401, 404, or 500.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::AppContext;
use crate::catalog;
use crate::chat;
use crate::error::ChatError;
use crate::models::{ChatRole, Product, ProductInput};

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/chat/history", get(handle_history))
        .route(
            "/api/products",
            get(handle_list_products).post(handle_create_product),
        )
        .route(
            "/api/products/{id}",
            put(handle_update_product).delete(handle_delete_product),
        )
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Bind and serve until the process is terminated.
pub async fn run_server(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let bind_addr = ctx.config.server.bind.clone();
    let app = build_router(ctx);

    info!(addr = %bind_addr, "storebot API listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error responses ============

/// Flat `{"error": "..."}` body with an HTTP status.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn unauthorized() -> ApiError {
    ApiError {
        status: StatusCode::UNAUTHORIZED,
        message: "authentication required".to_string(),
    }
}

fn not_found(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::EmptyInput => bad_request(e.to_string()),
            ChatError::Generation(_) | ChatError::Persistence(_) => internal(e.to_string()),
        }
    }
}

/// Resolve the caller's identity from the `x-user-id` header.
fn require_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(unauthorized)
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

async fn handle_chat(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let response = chat::handle_turn(&ctx, &user_id, &req.message).await?;
    Ok(Json(ChatResponse { response }))
}

// ============ GET /api/chat/history ============

#[derive(Serialize)]
struct HistoryEntry {
    role: ChatRole,
    text: String,
    status: String,
    created_at: i64,
}

async fn handle_history(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let user_id = require_user(&headers)?;
    let log = chat::history(&ctx.pool, &user_id)
        .await
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(
        log.into_iter()
            .map(|m| HistoryEntry {
                role: m.role,
                text: m.text,
                status: m.status,
                created_at: m.created_at,
            })
            .collect(),
    ))
}

// ============ Catalog ============

async fn handle_list_products(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = catalog::list_products(&ctx.pool)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(products))
}

async fn handle_create_product(
    State(ctx): State<Arc<AppContext>>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = catalog::create_product(&ctx.pool, &input)
        .await
        .map_err(|e| internal(e.to_string()))?;
    ctx.on_catalog_mutation().await;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn handle_update_product(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, ApiError> {
    let updated = catalog::update_product(&ctx.pool, &id, &input)
        .await
        .map_err(|e| internal(e.to_string()))?
        .ok_or_else(|| not_found(format!("no such product: {}", id)))?;
    ctx.on_catalog_mutation().await;
    Ok(Json(updated))
}

async fn handle_delete_product(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = catalog::delete_product(&ctx.pool, &id)
        .await
        .map_err(|e| internal(e.to_string()))?;
    if !deleted {
        return Err(not_found(format!("no such product: {}", id)));
    }
    ctx.on_catalog_mutation().await;
    Ok(StatusCode::NO_CONTENT)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
