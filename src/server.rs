//! JSON HTTP server.
//!
//! Builds contexts on request and serves the resulting chunks as downloads.
//! Chunks live in a [`SessionStore`] keyed by the caller's session id; the
//! engine itself stays stateless.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/context` | Build a context: `{"repository": "owner/name"}` |
//! | `GET`  | `/download/{session}/{index}` | Chunk `index` as a text attachment |
//!
//! The session id is read from the `x-session-id` request header. When it is
//! absent a new id is generated and returned in the response body.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `structure_unavailable` (502), `internal` (500).

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::chunk::chunk_filename;
use crate::config::Config;
use crate::error::ContextError;
use crate::pipeline::ContextBuilder;
use crate::session::{download_chunk, DownloadError, MemorySessionStore, SessionStore, StoredContext};

pub const SESSION_HEADER: &str = "x-session-id";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    builder: Arc<ContextBuilder>,
    sessions: Arc<dyn SessionStore>,
}

/// Starts the HTTP server with an in-memory session store.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_store(config, Arc::new(MemorySessionStore::new())).await
}

/// Starts the HTTP server with a caller-provided session store.
pub async fn run_server_with_store(
    config: &Config,
    sessions: Arc<dyn SessionStore>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let builder = Arc::new(ContextBuilder::new(config.clone())?);

    let app = router(AppState { builder, sessions });

    info!(bind = %bind_addr, "server listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/context", post(handle_context))
        .route("/download/{session}/{index}", get(handle_download))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
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

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl From<ContextError> for AppError {
    fn from(err: ContextError) -> Self {
        let message = err.to_string();
        match err {
            ContextError::InvalidIdentifier(_) => {
                Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
            }
            ContextError::RepositoryNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "not_found", message)
            }
            ContextError::StructureUnavailable { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, "structure_unavailable", message)
            }
        }
    }
}

impl From<DownloadError> for AppError {
    fn from(err: DownloadError) -> Self {
        let message = err.to_string();
        match err {
            DownloadError::UnknownSession => Self::new(StatusCode::NOT_FOUND, "not_found", message),
            DownloadError::IndexOutOfRange { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
            }
        }
    }
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

// ============ POST /context ============

#[derive(Deserialize)]
struct ContextRequest {
    repository: String,
}

#[derive(Serialize)]
struct ChunkSummary {
    index: usize,
    filename: String,
    bytes: usize,
    download: String,
}

#[derive(Serialize)]
struct ContextResponse {
    session_id: String,
    base_filename: String,
    total_bytes: usize,
    chunks: Vec<ChunkSummary>,
    /// Full document, present only when it fits in a single chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<String>,
}

async fn handle_context(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ContextRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let builder = state.builder.clone();
    let repository = request.repository;
    // The pipeline uses blocking HTTP; keep it off the async workers.
    let output = tokio::task::spawn_blocking(move || builder.build(&repository))
        .await
        .map_err(|e| {
            error!(error = %e, "build task failed");
            AppError::internal("context build task failed")
        })??;

    let chunks = output
        .chunks
        .iter()
        .map(|c| ChunkSummary {
            index: c.index,
            filename: chunk_filename(&output.base_filename, c.index),
            bytes: c.byte_len(),
            download: format!("/download/{}/{}", session_id, c.index),
        })
        .collect();

    let document = (!output.is_chunked()).then(|| output.document.clone());
    let response = ContextResponse {
        session_id: session_id.clone(),
        base_filename: output.base_filename.clone(),
        total_bytes: output.document.len(),
        chunks,
        document,
    };

    state.sessions.put(
        &session_id,
        StoredContext {
            chunks: output.chunks,
            base_filename: output.base_filename,
        },
    );

    Ok(Json(response))
}

// ============ GET /download/{session}/{index} ============

async fn handle_download(
    State(state): State<AppState>,
    Path((session, index)): Path<(String, usize)>,
) -> Result<Response, AppError> {
    let download = download_chunk(state.sessions.as_ref(), &session, index)?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download.filename
    ))
    .map_err(|e| AppError::internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::models::ContextChunk;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(config: Config, sessions: Arc<dyn SessionStore>) -> Router {
        router(AppState {
            builder: Arc::new(ContextBuilder::new(config).unwrap()),
            sessions,
        })
    }

    fn two_chunk_store() -> Arc<MemorySessionStore> {
        let store = Arc::new(MemorySessionStore::new());
        store.put(
            "s1",
            StoredContext {
                chunks: vec![
                    ContextChunk {
                        index: 0,
                        text: "first\n".to_string(),
                    },
                    ContextChunk {
                        index: 1,
                        text: "second\n".to_string(),
                    },
                ],
                base_filename: "widgets_context".to_string(),
            },
        );
        store
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_context(repository: &str, session: Option<&str>) -> Request<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri("/context")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = session {
            request = request.header(SESSION_HEADER, id);
        }
        request
            .body(Body::from(
                serde_json::json!({ "repository": repository }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_download_serves_attachment() {
        let app = app(Config::default(), two_chunk_store());
        let response = app.oneshot(get("/download/s1/1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"widgets_context_2.txt\""
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "second\n");
    }

    #[tokio::test]
    async fn test_download_index_out_of_range_is_bad_request() {
        let app = app(Config::default(), two_chunk_store());
        let response = app.oneshot(get("/download/s1/2")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_download_unknown_session_is_not_found() {
        let app = app(Config::default(), two_chunk_store());
        let response = app.oneshot(get("/download/other/0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_context_invalid_identifier_is_bad_request() {
        let app = app(Config::default(), Arc::new(MemorySessionStore::new()));
        let response = app
            .oneshot(post_context("not a repo", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_context_then_download_round_trip() {
        let mut upstream = mockito::Server::new_async().await;
        let _meta = upstream
            .mock("GET", "/repos/acme/widgets")
            .with_status(200)
            .with_body(r#"{"name": "widgets", "default_branch": "main"}"#)
            .create_async()
            .await;
        let _tree = upstream
            .mock("GET", "/repos/acme/widgets/git/trees/main")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"tree": [{"path": "index.js", "type": "blob"}]}"#)
            .create_async()
            .await;
        let _index = upstream
            .mock("GET", "/repos/acme/widgets/contents/index.js")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            // "var a = 1;\n"
            .with_body(r#"{"encoding": "base64", "content": "dmFyIGEgPSAxOwo="}"#)
            .create_async()
            .await;

        let mut config = Config::default();
        config.source.api_base = upstream.url();
        config.source.timeout_secs = 5;
        let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let app = app(config, sessions.clone());

        let response = app
            .clone()
            .oneshot(post_context("acme/widgets", Some("tab-7")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["session_id"], "tab-7");
        assert_eq!(body["chunks"][0]["filename"], "widgets_context_1.txt");
        assert_eq!(body["chunks"][0]["download"], "/download/tab-7/0");
        let document = body["document"].as_str().unwrap().to_string();
        assert!(document.contains("--- index.js ---\nvar a = 1;\n"));

        let response = app.oneshot(get("/download/tab-7/0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, document);
        assert!(sessions.get("tab-7").is_some());
    }

    #[test]
    fn test_context_error_status_mapping() {
        let err: AppError = ContextError::InvalidIdentifier("x".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");

        let err: AppError = ContextError::RepositoryNotFound {
            repo: "acme/widgets".to_string(),
            source: SourceError::Status {
                status: 404,
                url: "https://api.github.com/repos/acme/widgets".to_string(),
            },
        }
        .into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.message.contains("acme/widgets"));

        let err: AppError = ContextError::StructureUnavailable {
            repo: "acme/widgets".to_string(),
            source: SourceError::Malformed("boom".to_string()),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.code, "structure_unavailable");
    }

    #[test]
    fn test_download_error_is_client_error() {
        let err: AppError = DownloadError::IndexOutOfRange { index: 4, len: 2 }.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: AppError = DownloadError::UnknownSession.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
