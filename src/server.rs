//! HTTP surface: axum router, handlers and server startup.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /api/analyze` | multipart upload (field `file`) → [`ExtractionResult`] |
//! | `GET /api/health` | liveness probe |
//! | `GET /` | `index.html` from the static directory |
//! | `GET /static/*` | static assets |
//!
//! Every failure leaves through `impl IntoResponse for AuditError`, so the
//! client always gets one status code and one `{"detail": ...}` body.

use crate::analyze::ReceiptAnalyzer;
use crate::error::AuditError;
use crate::pipeline::validate::{UploadedFile, MAX_UPLOAD_BYTES};
use crate::receipt::ExtractionResult;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Multipart field carrying the receipt.
pub const FILE_FIELD: &str = "file";

/// Transport-level body limit.
///
/// Twice the upload ceiling, so an upload just over 10 MiB still reaches the
/// validator and is reported as `TooLarge` rather than cut off by axum.
pub const BODY_LIMIT_BYTES: usize = 2 * MAX_UPLOAD_BYTES;

/// Application state shared across routes.
#[derive(Clone, Debug)]
pub struct AppState {
    analyzer: ReceiptAnalyzer,
    static_dir: PathBuf,
}

impl AppState {
    pub fn new(analyzer: ReceiptAnalyzer) -> Self {
        let static_dir = analyzer.config().static_dir.clone();
        Self {
            analyzer,
            static_dir,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route(
            "/api/analyze",
            post(analyze_handler).layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES)),
        )
        .nest_service("/static", assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("Receipt auditor listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/analyze
pub async fn analyze_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractionResult>, AuditError> {
    let upload = read_upload(multipart).await?;
    let result = state.analyzer.analyze(upload).await?;
    Ok(Json(result))
}

/// Pull the `file` field out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile, AuditError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedFile::new(filename, content_type, bytes.to_vec()));
    }
    Err(AuditError::InvalidInput("No file provided".into()))
}

fn multipart_error(e: MultipartError) -> AuditError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AuditError::TooLarge {
            limit: MAX_UPLOAD_BYTES,
        }
    } else {
        AuditError::InvalidInput(format!("Failed to read multipart body: {}", e.body_text()))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    demo_mode: bool,
    provider_ready: bool,
    version: &'static str,
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        demo_mode: state.analyzer.config().demo_mode,
        provider_ready: state.analyzer.provider_ready(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /
async fn index(State(state): State<AppState>) -> Response {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
    }
}
