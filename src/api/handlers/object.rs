//! Single-shot upload handler for small files.

use super::{ApiError, AppState};
use crate::api::extractors::FileUpload;
use crate::types::StoredObject;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// POST /upload and POST /upload-file (multipart/form-data, one `file` part)
///
/// The part's filename becomes the object key and its declared content type
/// is stored with the object.
#[instrument(skip(state, file), fields(key = %file.name, size = file.data.len()))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    file: FileUpload,
) -> Result<Json<StoredObject>, ApiError> {
    let stored = state
        .uploader
        .put_object(&file.name, file.data, &file.content_type)
        .await?;
    Ok(Json(stored))
}
