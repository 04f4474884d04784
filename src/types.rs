//! Request and result types shared by the storage backends, the upload
//! orchestrator and the HTTP handlers.
//!
//! Everything here is request-scoped: the service never persists upload
//! sessions or part lists. The JSON shapes are the normalized response
//! contract returned to browser clients (camelCase field names).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Content type applied when the client does not provide one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One uploaded part as referenced in a Complete manifest.
///
/// Accepts both the documented `partNumber`/`eTag` spelling and the raw SDK
/// `PartNumber`/`ETag` spelling, since browser clients often forward the
/// UploadPart response verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDescriptor {
    #[serde(rename = "partNumber", alias = "PartNumber")]
    pub part_number: i32,
    #[serde(rename = "eTag", alias = "ETag", alias = "etag")]
    pub e_tag: String,
}

/// Result of CreateMultipartUpload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedUpload {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// Result of UploadPart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: String,
}

/// Result of CompleteMultipartUpload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedUpload {
    pub bucket: String,
    pub key: String,
    pub e_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Result of AbortMultipartUpload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortedUpload {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub aborted: bool,
}

/// Result of a single-shot PutObject
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub e_tag: String,
    pub size: u64,
    pub content_type: String,
}

/// Object body and content type as read back from storage
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub data: Bytes,
    pub content_type: String,
}
