//! Upload orchestration
//!
//! Sequences the multipart protocol (initiate, upload-part, complete, abort)
//! and the single-shot put against one bucket. Holds no session state: the
//! client carries the upload id and part list between calls, so every
//! operation is exactly one backend call and any instance can serve any
//! request.

use crate::storage::{StorageBackend, StorageError};
use crate::types::{
    AbortedUpload, CompletedUpload, InitiatedUpload, PartDescriptor, StoredObject, UploadedPart,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// Stateless front for the storage backend, bound to one bucket.
#[derive(Clone)]
pub struct Uploader {
    backend: Arc<dyn StorageBackend>,
    bucket: String,
}

impl Uploader {
    pub fn new(backend: Arc<dyn StorageBackend>, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// CreateMultipartUpload
    pub async fn initiate(
        &self,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<InitiatedUpload, StorageError> {
        info!("CreateMultipartUpload {}/{}", self.bucket, key);
        let initiated = self
            .backend
            .create_multipart_upload(&self.bucket, key, content_type)
            .await?;
        debug!(
            "CreateMultipartUpload {}/{} uploadId={}",
            self.bucket, key, initiated.upload_id
        );
        Ok(initiated)
    }

    /// UploadPart. Calls for different part numbers may run concurrently.
    pub async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadedPart, StorageError> {
        info!(
            "UploadPart {}/{} uploadId={} part={} ({} bytes)",
            self.bucket,
            key,
            upload_id,
            part_number,
            data.len()
        );
        self.backend
            .upload_part(&self.bucket, key, upload_id, part_number, data)
            .await
    }

    /// CompleteMultipartUpload.
    ///
    /// Parts are sent in ascending part-number order whatever order the
    /// client collected them in. A rejected manifest is returned as-is; the
    /// session is not aborted.
    pub async fn complete(
        &self,
        key: &str,
        upload_id: &str,
        mut parts: Vec<PartDescriptor>,
    ) -> Result<CompletedUpload, StorageError> {
        parts.sort_by_key(|p| p.part_number);
        info!(
            "CompleteMultipartUpload {}/{} uploadId={} ({} parts)",
            self.bucket,
            key,
            upload_id,
            parts.len()
        );
        self.backend
            .complete_multipart_upload(&self.bucket, key, upload_id, &parts)
            .await
    }

    /// AbortMultipartUpload
    pub async fn abort(&self, key: &str, upload_id: &str) -> Result<AbortedUpload, StorageError> {
        info!(
            "AbortMultipartUpload {}/{} uploadId={}",
            self.bucket, key, upload_id
        );
        self.backend
            .abort_multipart_upload(&self.bucket, key, upload_id)
            .await?;
        Ok(AbortedUpload {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            aborted: true,
        })
    }

    /// Single-shot PutObject for small files
    pub async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        info!(
            "PutObject {}/{} ({} bytes, {})",
            self.bucket,
            key,
            data.len(),
            content_type
        );
        self.backend
            .put_object(&self.bucket, key, data, content_type)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn uploader() -> Uploader {
        Uploader::new(Arc::new(MemoryBackend::with_min_part_size(0)), "drops")
    }

    #[tokio::test]
    async fn test_complete_sorts_parts() {
        let up = uploader();
        let id = up.initiate("f.bin", None).await.unwrap().upload_id;

        let mut parts = Vec::new();
        for (n, body) in [(3, "ccc"), (1, "a"), (2, "bb")] {
            let uploaded = up
                .upload_part("f.bin", &id, n, Bytes::from_static(body.as_bytes()))
                .await
                .unwrap();
            parts.push(PartDescriptor {
                part_number: uploaded.part_number,
                e_tag: uploaded.e_tag,
            });
        }

        let done = up.complete("f.bin", &id, parts).await.unwrap();
        assert_eq!(done.bucket, "drops");
        assert!(done.e_tag.ends_with("-3\""));

        let object = up.backend().get_object("drops", "f.bin").await.unwrap();
        assert_eq!(object.data.as_ref(), b"abbccc");
    }

    #[tokio::test]
    async fn test_abort_reports_session() {
        let up = uploader();
        let id = up.initiate("f.bin", None).await.unwrap().upload_id;

        let aborted = up.abort("f.bin", &id).await.unwrap();
        assert!(aborted.aborted);
        assert_eq!(aborted.upload_id, id);

        let again = up.abort("f.bin", &id).await;
        assert!(matches!(again, Err(StorageError::NoSuchUpload(_))));
    }

    #[tokio::test]
    async fn test_put_object_uses_bound_bucket() {
        let up = uploader();
        let stored = up
            .put_object("a.txt", Bytes::from_static(b"hey"), "text/plain")
            .await
            .unwrap();
        assert_eq!(stored.bucket, up.bucket());
        assert!(up.backend().get_object("drops", "a.txt").await.is_ok());
    }
}
