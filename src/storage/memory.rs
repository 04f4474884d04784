//! In-memory storage backend
//!
//! Keeps in-progress multipart uploads and finished objects in process memory
//! and enforces the same multipart rules R2/S3 do, so the upload endpoints
//! behave identically in local development and tests. Everything is lost on
//! restart.

use super::traits::{StorageBackend, StorageError};
use crate::config::DEFAULT_MIN_PART_SIZE;
use crate::types::{
    CompletedUpload, InitiatedUpload, ObjectData, PartDescriptor, StoredObject, UploadedPart,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use md5::{Digest, Md5};
use parking_lot::RwLock;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const MAX_PART_NUMBER: i32 = 10_000;

/// Data for a single uploaded part
struct PartData {
    data: Bytes,
    md5_hex: String,
    md5_raw: [u8; 16],
}

/// State for an in-progress multipart upload
struct MultipartUpload {
    bucket: String,
    key: String,
    content_type: Option<String>,
    parts: HashMap<i32, PartData>,
}

/// A finished object
struct StoredBlob {
    data: Bytes,
    content_type: String,
}

/// Thread-safe in-memory object store with S3 multipart semantics
pub struct MemoryBackend {
    uploads: RwLock<HashMap<String, MultipartUpload>>,
    objects: RwLock<HashMap<(String, String), StoredBlob>>,
    min_part_size: u64,
    id_counter: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_min_part_size(DEFAULT_MIN_PART_SIZE)
    }

    /// Build a store with a custom minimum part size (0 disables the check).
    pub fn with_min_part_size(min_part_size: u64) -> Self {
        Self {
            uploads: RwLock::new(HashMap::new()),
            objects: RwLock::new(HashMap::new()),
            min_part_size,
            id_counter: AtomicU64::new(0),
        }
    }

    /// Number of uploads that are neither completed nor aborted.
    pub fn pending_uploads(&self) -> usize {
        self.uploads.read().len()
    }

    fn next_upload_id(&self, bucket: &str, key: &str) -> String {
        let counter = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);

        // SHA256(counter + timestamp_nanos + bucket + key), first 32 hex chars
        let mut hasher = Sha256::new();
        hasher.update(counter.to_le_bytes());
        hasher.update(nanos.to_le_bytes());
        hasher.update(bucket.as_bytes());
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();
        hex::encode(&hash[..16])
    }
}

/// Look up an upload, treating a bucket/key mismatch like an unknown id.
fn find_upload<'a>(
    uploads: &'a HashMap<String, MultipartUpload>,
    upload_id: &str,
    bucket: &str,
    key: &str,
) -> Result<&'a MultipartUpload, StorageError> {
    match uploads.get(upload_id) {
        Some(upload) if upload.bucket == bucket && upload.key == key => Ok(upload),
        _ => Err(StorageError::NoSuchUpload(upload_id.to_string())),
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<InitiatedUpload, StorageError> {
        let upload_id = self.next_upload_id(bucket, key);
        let upload = MultipartUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.map(str::to_string),
            parts: HashMap::new(),
        };
        self.uploads.write().insert(upload_id.clone(), upload);
        debug!("memory: created upload {} for {}/{}", upload_id, bucket, key);

        Ok(InitiatedUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadedPart, StorageError> {
        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(StorageError::rejected(
                "InvalidArgument",
                "Part number must be an integer between 1 and 10000, inclusive",
            ));
        }

        let md5_raw: [u8; 16] = Md5::digest(&data).into();
        let md5_hex = hex::encode(md5_raw);
        let e_tag = format!("\"{}\"", md5_hex);

        let mut uploads = self.uploads.write();
        let upload = match uploads.get_mut(upload_id) {
            Some(upload) if upload.bucket == bucket && upload.key == key => upload,
            _ => return Err(StorageError::NoSuchUpload(upload_id.to_string())),
        };
        // Overwrite semantics: re-uploading same part_number replaces previous data
        upload.parts.insert(
            part_number,
            PartData {
                data,
                md5_hex,
                md5_raw,
            },
        );

        Ok(UploadedPart { part_number, e_tag })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<CompletedUpload, StorageError> {
        let mut uploads = self.uploads.write();
        let upload = find_upload(&uploads, upload_id, bucket, key)?;

        if parts.is_empty() {
            return Err(StorageError::rejected(
                "InvalidPart",
                "You must specify at least one part",
            ));
        }

        for window in parts.windows(2) {
            if window[0].part_number >= window[1].part_number {
                return Err(StorageError::rejected(
                    "InvalidPartOrder",
                    "The list of parts was not in ascending order",
                ));
            }
        }

        let mut md5_concat = Vec::with_capacity(parts.len() * 16);
        let mut assembled = BytesMut::new();
        let last = parts.len() - 1;

        for (index, requested) in parts.iter().enumerate() {
            let part = upload.parts.get(&requested.part_number).ok_or_else(|| {
                StorageError::rejected(
                    "InvalidPart",
                    format!("Part {} has not been uploaded", requested.part_number),
                )
            })?;

            // Normalize ETags for comparison (strip quotes)
            let requested_clean = requested.e_tag.trim_matches('"');
            if requested_clean != part.md5_hex {
                return Err(StorageError::rejected(
                    "InvalidPart",
                    format!(
                        "ETag mismatch for part {}: expected \"{}\", got \"{}\"",
                        requested.part_number, part.md5_hex, requested_clean
                    ),
                ));
            }

            if index != last && (part.data.len() as u64) < self.min_part_size {
                return Err(StorageError::rejected(
                    "EntityTooSmall",
                    format!(
                        "Part {} is {} bytes; every part but the last must be at least {} bytes",
                        requested.part_number,
                        part.data.len(),
                        self.min_part_size
                    ),
                ));
            }

            md5_concat.extend_from_slice(&part.md5_raw);
            assembled.extend_from_slice(&part.data);
        }

        // S3-compatible multipart ETag: MD5(concat of part MD5 raw bytes)-N
        let final_md5 = Md5::digest(&md5_concat);
        let e_tag = format!("\"{}-{}\"", hex::encode(final_md5), parts.len());
        let content_type = upload
            .content_type
            .clone()
            .unwrap_or_else(|| crate::types::DEFAULT_CONTENT_TYPE.to_string());

        uploads.remove(upload_id);
        drop(uploads);

        debug!(
            "memory: completed upload {} into {}/{} ({} bytes)",
            upload_id,
            bucket,
            key,
            assembled.len()
        );
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredBlob {
                data: assembled.freeze(),
                content_type,
            },
        );

        Ok(CompletedUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag,
            location: Some(format!("/{}/{}", bucket, key)),
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        let mut uploads = self.uploads.write();
        find_upload(&uploads, upload_id, bucket, key)?;
        uploads.remove(upload_id);
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let e_tag = format!("\"{}\"", hex::encode(Md5::digest(&data)));
        let size = data.len() as u64;

        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );

        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag,
            size,
            content_type: content_type.to_string(),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectData, StorageError> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|blob| ObjectData {
                data: blob.data.clone(),
                content_type: blob.content_type.clone(),
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
