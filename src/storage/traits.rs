//! Storage backend trait definitions

use crate::types::{
    CompletedUpload, InitiatedUpload, ObjectData, PartDescriptor, StoredObject, UploadedPart,
};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("The specified multipart upload does not exist: {0}")]
    NoSuchUpload(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    /// The backend refused the request itself (bad part list, part too
    /// small, part number out of range). `code` is the S3 error code.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    pub fn rejected(code: &str, message: impl Into<String>) -> Self {
        StorageError::Rejected {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// S3-style error code, used in the JSON error envelope
    pub fn code(&self) -> &str {
        match self {
            StorageError::NoSuchUpload(_) => "NoSuchUpload",
            StorageError::NotFound(_) => "NoSuchKey",
            StorageError::Rejected { code, .. } => code,
            StorageError::S3(_) | StorageError::Other(_) => "StorageError",
        }
    }
}

/// Abstract S3-like object storage: the five bucket operations the upload
/// endpoints need, plus read-back.
///
/// Every method is a single backend round trip against one bucket.
/// This trait is object-safe and can be used with `Arc<dyn StorageBackend>`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Allocate a new multipart upload and return its upload id
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<InitiatedUpload, StorageError>;

    /// Upload one part. Re-uploading a part number replaces the previous body.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadedPart, StorageError>;

    /// Assemble the listed parts (ascending part number) into the final object
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<CompletedUpload, StorageError>;

    /// Discard an upload and any parts uploaded so far
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError>;

    /// Store a whole object in one call
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Read an object back with its content type
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectData, StorageError>;
}
