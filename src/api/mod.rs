use axum::{
    routing::{get, post},
    Router,
    Json,
    extract::State,
    response::{IntoResponse, Response},
    http::StatusCode,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::database::Database;
use crate::document::{Document, DocumentIngestor, IngestError};
use crate::llm::QueryProcessor;

const MAX_CONCURRENT_REQUESTS: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<QueryProcessor>,
    pub ingestor: Arc<DocumentIngestor>,
    pub db: Arc<Database>,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 4000))]
    pub query: String,
    #[serde(default = "default_language")]
    #[validate(length(min = 1, max = 16))]
    pub language: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IngestRequest {
    #[validate(length(min = 1))]
    pub path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub document: Document,
    pub chunk_count: usize,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse { status: message.into() })).into_response()
}

/// Create and configure the API router
pub fn create_api(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/api/v1/query", post(query_handler))
        .route("/api/documents", post(ingest_handler).get(list_documents_handler))
        .route("/health", get(health_check))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(cors)
        .with_state(state)
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return reject(StatusCode::BAD_REQUEST, format!("Invalid query request: {}", e));
    }

    info!("Query received ({} chars, language {})", request.query.chars().count(), request.language);
    let result = state.processor.process_query(&request.query, &request.language).await;
    Json(result).into_response()
}

async fn ingest_handler(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return reject(StatusCode::BAD_REQUEST, format!("Invalid ingest request: {}", e));
    }

    let path = PathBuf::from(&request.path);
    match state.ingestor.ingest_file(&path).await {
        Ok(report) => Json(IngestResponse {
            document: report.document,
            chunk_count: report.chunk_count,
        })
        .into_response(),
        Err(IngestError::Extract(e)) => reject(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        Err(e) => {
            error!("Ingestion of {} failed: {}", request.path, e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn list_documents_handler(State(state): State<AppState>) -> Response {
    match state.db.list_documents().await {
        Ok(documents) => Json(documents).into_response(),
        Err(e) => {
            error!("Database error: {}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

async fn health_check() -> Response {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string()
    }).into_response()
}
