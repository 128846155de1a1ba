//! HTTP Routes
//!
//! - `/` - Landing page with the upload form and file list
//! - `/upload` - File upload
//! - `/files` - Bucket listing
//! - `/download/{filename}` - File download
//! - `/api/health` - Health check

pub mod files;
pub mod health;
pub mod ui;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
///
/// Request bodies are unbounded unless `MAX_UPLOAD_BYTES` is configured,
/// since uploads are buffered whole and passed to the bucket.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let body_limit = match state.config.server.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };
    let allowed_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(ui::router())
        .merge(files::router(state.clone()))
        .merge(health::router(state))
        .layer(body_limit);

    apply_cors(router, &allowed_origins).layer(TraceLayer::new_for_http())
}
