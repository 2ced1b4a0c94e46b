//! HTTP surface for the assistant.
//!
//! A small JSON API wrapping the resolver, suitable for a chat widget or
//! any other frontend.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Resolve a query to an answer |
//! | `POST` | `/ingest` | Clean, chunk, and index raw text |
//! | `POST` | `/clear` | Drop indexed passages and cached answers, then reseed the baseline |
//! | `GET`  | `/health` | Health check (version, document and cache counts, uptime) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message is required" } }
//! ```
//!
//! Only malformed payloads produce errors here. An unanswerable question
//! is not an error — the resolver always degrades to a fixed reply.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based chat clients.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ingest;
use crate::models::AnswerSource;
use crate::resolver::Resolver;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    resolver: Arc<Resolver>,
    started_at: DateTime<Utc>,
    /// Fingerprints of payloads already ingested, for idempotent uploads.
    ingested: Arc<Mutex<HashSet<String>>>,
}

/// Start the HTTP server on the configured bind address.
///
/// Builds and seeds a resolver, then serves until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let resolver = Resolver::from_config(config)?;
    let seeded = resolver.seed(config)?;
    tracing::info!("seeded {} passages", seeded);

    let state = AppState {
        config: Arc::new(config.clone()),
        resolver: Arc::new(resolver),
        started_at: Utc::now(),
        ingested: Arc::new(Mutex::new(HashSet::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .route("/ingest", post(handle_ingest))
        .route("/clear", post(handle_clear))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    tracing::info!("casebook listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error body: `{ "error": { "code": ..., "message": ... } }`.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    source: AnswerSource,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req
        .message
        .ok_or_else(|| AppError::bad_request("message is required"))?;

    let resolution = state.resolver.resolve(&message).await;
    tracing::debug!(source = resolution.source.name(), "resolved chat message");

    Ok(Json(ChatResponse {
        response: resolution.answer,
        source: resolution.source,
    }))
}

// ============ /ingest ============

#[derive(Deserialize)]
struct IngestRequest {
    text: Option<String>,
    title: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    chunks: usize,
    documents: usize,
    skipped: bool,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let text = req
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("text is required"))?;

    let fingerprint = ingest::fingerprint(&text);
    let already_seen = !state.ingested.lock().unwrap().insert(fingerprint);

    let chunks = if already_seen {
        0
    } else {
        let added = state.resolver.ingest_text(&text);
        tracing::info!(
            "ingested {} ({} chunks)",
            req.title.as_deref().unwrap_or("untitled payload"),
            added
        );
        added
    };

    Ok(Json(IngestResponse {
        chunks,
        documents: state.resolver.document_count(),
        skipped: already_seen,
    }))
}

// ============ /clear ============

#[derive(Serialize)]
struct ClearResponse {
    message: String,
    documents: usize,
}

async fn handle_clear(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    state.resolver.clear();
    state.ingested.lock().unwrap().clear();

    // Reseeding after a clear is caller policy; the server restores the
    // configured baseline so the assistant keeps answering.
    let reseeded = state
        .resolver
        .seed(&state.config)
        .map_err(|e| AppError::internal(format!("reseed failed: {e:#}")))?;
    tracing::info!("cleared index, reseeded {} passages", reseeded);

    Ok(Json(ClearResponse {
        message: "Document data cleared successfully".to_string(),
        documents: state.resolver.document_count(),
    }))
}

// ============ /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    documents: usize,
    cache_entries: usize,
    uptime_secs: i64,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: state.resolver.document_count(),
        cache_entries: state.resolver.cache_len(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}
