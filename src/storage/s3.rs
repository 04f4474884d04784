//! S3 storage backend implementation using AWS SDK
//!
//! Talks to Cloudflare R2 through its S3-compatible API. The client is built
//! once from static credentials and shared by every request; each trait method
//! is exactly one SDK call and errors are classified, never retried here.

use super::traits::{StorageBackend, StorageError};
use crate::config::BackendConfig;
use crate::types::{
    CompletedUpload, InitiatedUpload, ObjectData, PartDescriptor, StoredObject, UploadedPart,
    DEFAULT_CONTENT_TYPE,
};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, instrument};

/// S3-compatible storage backend (R2 in production)
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Build an S3 client from a BackendConfig without creating an S3Backend.
    pub fn build_client(config: &BackendConfig) -> Result<Client, StorageError> {
        let (region, force_path_style, access_key_id, secret_access_key) = match config {
            BackendConfig::R2 {
                region,
                force_path_style,
                access_key_id,
                secret_access_key,
                ..
            } => (
                region.clone(),
                *force_path_style,
                access_key_id.clone(),
                secret_access_key.clone(),
            ),
            _ => {
                return Err(StorageError::Other(
                    "S3Backend requires R2 configuration".to_string(),
                ))
            }
        };

        let endpoint = config
            .endpoint_url()
            .map_err(|e| StorageError::Other(e.to_string()))?;

        // Require explicit credentials; never fall back to the default AWS credential chain
        let credentials = match (access_key_id, secret_access_key) {
            (Some(ref key_id), Some(ref secret)) => {
                Credentials::new(key_id, secret, None, None, "file_drop-config")
            }
            _ => {
                return Err(StorageError::Other(
                    "R2 backend requires explicit credentials: set ACCESS_KEY_ID and SECRET_ACCESS_KEY".to_string(),
                ));
            }
        };

        // Build S3 client directly, no aws-config needed since we use static credentials
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(force_path_style)
            .build();

        Ok(Client::from_conf(s3_config))
    }

    /// Create a new S3 backend from configuration
    pub fn new(config: &BackendConfig) -> Result<Self, StorageError> {
        let client = Self::build_client(config)?;
        debug!("S3Backend initialized");
        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Classify an SDK error by its S3 error code and HTTP status.
    fn classify_s3_error<E>(
        e: &SdkError<E>,
        context: &str,
        key: &str,
        upload_id: Option<&str>,
    ) -> StorageError
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        if let SdkError::ServiceError(svc) = e {
            return classify_service_error(
                svc.err().code(),
                svc.err().message(),
                svc.raw().status().as_u16(),
                context,
                key,
                upload_id,
            );
        }
        StorageError::S3(format!("{} failed: {}", context, DisplayErrorContext(e)))
    }
}

/// Map an S3 service error (code, message, HTTP status) onto a StorageError.
///
/// Some S3-compatible providers omit the error code on 404s, so the status
/// decides between a missing upload and a missing object.
fn classify_service_error(
    code: Option<&str>,
    message: Option<&str>,
    status: u16,
    context: &str,
    key: &str,
    upload_id: Option<&str>,
) -> StorageError {
    match (code, status) {
        (Some("NoSuchUpload"), _) => {
            StorageError::NoSuchUpload(upload_id.unwrap_or_default().to_string())
        }
        (Some("NoSuchKey"), _) => StorageError::NotFound(key.to_string()),
        // A missing bucket is a server misconfiguration, not a client error
        (Some("NoSuchBucket"), _) => StorageError::S3(format!(
            "{} failed: NoSuchBucket (HTTP {}): {}",
            context,
            status,
            message.unwrap_or("The specified bucket does not exist")
        )),
        (_, 404) => match upload_id {
            Some(id) => StorageError::NoSuchUpload(id.to_string()),
            None => StorageError::NotFound(key.to_string()),
        },
        (code, 400) => StorageError::Rejected {
            code: code.unwrap_or("InvalidRequest").to_string(),
            message: message.unwrap_or("Bad Request").to_string(),
        },
        (code, status) => StorageError::S3(format!(
            "{} failed: {} (HTTP {}): {}",
            context,
            code.unwrap_or("UnknownError"),
            status,
            message.unwrap_or("no message")
        )),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    #[instrument(skip(self))]
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<InitiatedUpload, StorageError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| Self::classify_s3_error(&e, "create_multipart_upload", key, None))?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| StorageError::S3("CreateMultipartUpload returned no UploadId".into()))?
            .to_string();

        debug!("S3 CreateMultipartUpload {}/{} -> {}", bucket, key, upload_id);
        Ok(InitiatedUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
        })
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadedPart, StorageError> {
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::classify_s3_error(&e, "upload_part", key, Some(upload_id)))?;

        let e_tag = output
            .e_tag()
            .ok_or_else(|| StorageError::S3("UploadPart returned no ETag".into()))?
            .to_string();

        debug!("S3 UploadPart {}/{} #{} -> {}", bucket, key, part_number, e_tag);
        Ok(UploadedPart { part_number, e_tag })
    }

    #[instrument(skip(self, parts), fields(parts = parts.len()))]
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<CompletedUpload, StorageError> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.e_tag)
                    .build()
            })
            .collect();
        let manifest = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(manifest)
            .send()
            .await
            .map_err(|e| {
                Self::classify_s3_error(&e, "complete_multipart_upload", key, Some(upload_id))
            })?;

        debug!("S3 CompleteMultipartUpload {}/{} ({} parts)", bucket, key, parts.len());
        Ok(CompletedUpload {
            bucket: output.bucket().unwrap_or(bucket).to_string(),
            key: output.key().unwrap_or(key).to_string(),
            e_tag: output.e_tag().unwrap_or_default().to_string(),
            location: output.location().map(str::to_string),
        })
    }

    #[instrument(skip(self))]
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| {
                Self::classify_s3_error(&e, "abort_multipart_upload", key, Some(upload_id))
            })?;

        debug!("S3 AbortMultipartUpload {}/{} {}", bucket, key, upload_id);
        Ok(())
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let size = data.len() as u64;
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size as i64)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::classify_s3_error(&e, "put_object", key, None))?;

        debug!("S3 PUT {}/{} ({} bytes)", bucket, key, size);
        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag: output.e_tag().unwrap_or_default().to_string(),
            size,
            content_type: content_type.to_string(),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectData, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::classify_s3_error(&e, "get_object", key, None))?;

        let content_type = response
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(format!("Failed to read response body: {}", e)))?
            .into_bytes();

        debug!("S3 GET {}/{} ({} bytes)", bucket, key, data.len());
        Ok(ObjectData { data, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(code: Option<&str>, status: u16, upload_id: Option<&str>) -> StorageError {
        classify_service_error(code, Some("msg"), status, "op", "key.bin", upload_id)
    }

    #[test]
    fn test_no_such_upload_by_code() {
        let err = classify(Some("NoSuchUpload"), 404, Some("abc"));
        assert!(matches!(err, StorageError::NoSuchUpload(ref id) if id == "abc"));
    }

    #[test]
    fn test_bare_404_depends_on_upload_context() {
        assert!(matches!(
            classify(None, 404, Some("abc")),
            StorageError::NoSuchUpload(_)
        ));
        assert!(matches!(classify(None, 404, None), StorageError::NotFound(_)));
        assert!(matches!(
            classify(Some("NoSuchKey"), 404, None),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn test_no_such_bucket_is_storage_error() {
        for upload_id in [None, Some("u1")] {
            let err = classify(Some("NoSuchBucket"), 404, upload_id);
            assert!(matches!(err, StorageError::S3(ref m) if m.contains("NoSuchBucket")));
            assert_eq!(err.code(), "StorageError");
        }
    }

    #[test]
    fn test_400_is_rejected_with_code() {
        let err = classify(Some("EntityTooSmall"), 400, Some("abc"));
        assert_eq!(err.code(), "EntityTooSmall");

        let err = classify(None, 400, None);
        assert_eq!(err.code(), "InvalidRequest");
    }

    #[test]
    fn test_other_statuses_are_storage_errors() {
        let err = classify(Some("AccessDenied"), 403, None);
        assert!(matches!(err, StorageError::S3(ref m) if m.contains("AccessDenied")));
        assert_eq!(err.code(), "StorageError");

        let err = classify(None, 503, None);
        assert!(matches!(err, StorageError::S3(_)));
    }

    #[test]
    fn test_build_client_requires_credentials() {
        let config = BackendConfig::R2 {
            account_id: Some("acct".to_string()),
            endpoint: None,
            region: "auto".to_string(),
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
        };
        assert!(matches!(
            S3Backend::build_client(&config),
            Err(StorageError::Other(ref m)) if m.contains("credentials")
        ));
    }

    #[test]
    fn test_build_client_requires_endpoint() {
        let config = BackendConfig::R2 {
            account_id: None,
            endpoint: None,
            region: "auto".to_string(),
            force_path_style: false,
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
        };
        assert!(S3Backend::build_client(&config).is_err());
    }

    #[test]
    fn test_build_client_rejects_memory_config() {
        let config = BackendConfig::Memory { min_part_size: 0 };
        assert!(S3Backend::new(&config).is_err());
    }
}
