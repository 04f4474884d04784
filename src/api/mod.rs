//! Browser-facing upload API

mod errors;
mod extractors;
pub mod handlers;

pub use errors::{ApiError, BAD_REQUEST_MESSAGE};
pub use extractors::{parse_part_number, ObjectKey};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use handlers::{
    abort_upload, complete_upload, health_check, initiate_upload, upload_file, upload_part,
    AppState,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the upload router.
///
/// Routes:
///   POST /initiate-upload - CreateMultipartUpload
///   POST /upload-part     - UploadPart (form-data)
///   POST /complete-upload - CompleteMultipartUpload
///   POST /abort-upload    - AbortMultipartUpload
///   POST /upload          - PutObject (form-data), also at /upload-file
///   GET  /health
pub fn router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/initiate-upload", post(initiate_upload))
        .route("/upload-part", post(upload_part))
        .route("/complete-upload", post(complete_upload))
        .route("/abort-upload", post(abort_upload))
        .route("/upload", post(upload_file))
        .route("/upload-file", post(upload_file))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // The axum default of 2 MiB is smaller than a typical part
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}
