//! Multipart upload handlers: initiate, upload-part, complete, abort.
//!
//! Each handler makes exactly one storage call. Nothing is remembered
//! between requests; the client carries the upload id and the part list.

use super::{ApiError, AppState};
use crate::api::extractors::{
    AbortUploadRequest, CompleteUploadRequest, InitiateUploadRequest, UploadPartRequest, ValidJson,
};
use crate::types::{AbortedUpload, CompletedUpload, InitiatedUpload, UploadedPart};
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// POST /initiate-upload
#[instrument(skip(state, req), fields(key = %req.name))]
pub async fn initiate_upload(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<InitiateUploadRequest>,
) -> Result<Json<InitiatedUpload>, ApiError> {
    let initiated = state
        .uploader
        .initiate(&req.name, req.content_type.as_deref())
        .await?;
    Ok(Json(initiated))
}

/// POST /upload-part (multipart/form-data)
#[instrument(skip(state, req), fields(key = %req.name, part = req.part_number))]
pub async fn upload_part(
    State(state): State<Arc<AppState>>,
    req: UploadPartRequest,
) -> Result<Json<UploadedPart>, ApiError> {
    let part = state
        .uploader
        .upload_part(&req.name, &req.upload_id, req.part_number, req.chunk)
        .await?;
    debug!("Part {} stored with ETag {}", part.part_number, part.e_tag);
    Ok(Json(part))
}

/// POST /complete-upload
#[instrument(skip(state, req), fields(key = %req.name, parts = req.meta.len()))]
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CompleteUploadRequest>,
) -> Result<Json<CompletedUpload>, ApiError> {
    let completed = state
        .uploader
        .complete(&req.name, &req.upload_id, req.meta)
        .await?;
    Ok(Json(completed))
}

/// POST /abort-upload
#[instrument(skip(state, req), fields(key = %req.name))]
pub async fn abort_upload(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<AbortUploadRequest>,
) -> Result<Json<AbortedUpload>, ApiError> {
    let aborted = state.uploader.abort(&req.name, &req.upload_id).await?;
    Ok(Json(aborted))
}
