//! Typed request extractors for the upload API
//!
//! Every endpoint body is validated here, once, into a typed request. Any
//! missing field, wrong type or unreadable body becomes
//! `ApiError::InvalidRequest` before a handler runs, so a rejected request
//! never reaches storage.

use super::errors::ApiError;
use crate::types::{PartDescriptor, DEFAULT_CONTENT_TYPE};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Caller-supplied object key. Never normalized; the only rule is that it
/// is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err("object key must not be empty".to_string());
        }
        Ok(ObjectKey(value))
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for ObjectKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Post-deserialization checks that serde cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// POST /initiate-upload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest {
    pub name: ObjectKey,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Validate for InitiateUploadRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// POST /complete-upload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    pub name: ObjectKey,
    pub upload_id: String,
    #[serde(deserialize_with = "part_objects")]
    pub meta: Vec<PartDescriptor>,
}

/// `meta` entries must be JSON objects, never positional arrays.
fn part_objects<'de, D>(deserializer: D) -> Result<Vec<PartDescriptor>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let entries = Vec::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;
    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(serde_json::Value::Object(entry)).map_err(D::Error::custom)
        })
        .collect()
}

impl Validate for CompleteUploadRequest {
    fn validate(&self) -> Result<(), String> {
        require_upload_id(&self.upload_id)?;
        if self.meta.is_empty() {
            return Err("meta must list at least one part".to_string());
        }
        let mut seen = HashSet::with_capacity(self.meta.len());
        for part in &self.meta {
            if !seen.insert(part.part_number) {
                return Err(format!("part {} listed more than once", part.part_number));
            }
        }
        Ok(())
    }
}

/// POST /abort-upload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadRequest {
    pub name: ObjectKey,
    pub upload_id: String,
}

impl Validate for AbortUploadRequest {
    fn validate(&self) -> Result<(), String> {
        require_upload_id(&self.upload_id)
    }
}

fn require_upload_id(upload_id: &str) -> Result<(), String> {
    if upload_id.is_empty() {
        return Err("uploadId must not be empty".to_string());
    }
    Ok(())
}

/// JSON body extractor that validates into `T`.
///
/// Parses the body regardless of the Content-Type header; browser clients
/// frequently post JSON without one.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge
            } else {
                ApiError::invalid(format!("unreadable body: {}", e))
            }
        })?;

        let json: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::invalid(format!("invalid JSON body: {}", e)))?;
        // Derived structs would also match a JSON array by position
        if !json.is_object() {
            return Err(ApiError::invalid("JSON body must be an object"));
        }
        let value: T = serde_json::from_value(json)
            .map_err(|e| ApiError::invalid(format!("invalid JSON body: {}", e)))?;
        value.validate().map_err(ApiError::InvalidRequest)?;
        Ok(ValidJson(value))
    }
}

/// One multipart/form-data entry
#[derive(Debug)]
enum FormValue {
    /// Plain field (no filename)
    Text(String),
    /// File part (has a filename, possibly empty)
    File {
        file_name: String,
        content_type: Option<String>,
        data: Bytes,
    },
}

/// All fields of a multipart form, keyed by name. A repeated name keeps the
/// last value.
#[derive(Debug)]
struct FormFields(HashMap<String, FormValue>);

impl FormFields {
    async fn read<S: Send + Sync>(req: Request, state: &S) -> Result<Self, ApiError> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid(format!("not a multipart form: {}", e)))?;

        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await.map_err(form_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(form_error)?;
                    FormValue::File {
                        file_name,
                        content_type,
                        data,
                    }
                }
                None => FormValue::Text(field.text().await.map_err(form_error)?),
            };
            fields.insert(name, value);
        }
        Ok(FormFields(fields))
    }

    /// Take a plain text field
    fn text(&mut self, name: &str) -> Result<String, ApiError> {
        match self.0.remove(name) {
            Some(FormValue::Text(value)) => Ok(value),
            Some(FormValue::File { .. }) => Err(ApiError::invalid(format!(
                "field `{}` must be text, got a file",
                name
            ))),
            None => Err(ApiError::invalid(format!("missing field `{}`", name))),
        }
    }

    /// Take a file field as (file name, content type, body)
    fn file(&mut self, name: &str) -> Result<(String, Option<String>, Bytes), ApiError> {
        match self.0.remove(name) {
            Some(FormValue::File {
                file_name,
                content_type,
                data,
            }) => Ok((file_name, content_type, data)),
            Some(FormValue::Text(_)) => Err(ApiError::invalid(format!(
                "field `{}` must be a file, got text",
                name
            ))),
            None => Err(ApiError::invalid(format!("missing field `{}`", name))),
        }
    }
}

fn form_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::invalid(format!("malformed multipart form: {}", e))
    }
}

/// Parse a form `partNumber` (a numeric string) into an integer.
///
/// Only plain decimal integers are accepted; `1.0`, `1e3` or `0x10` are
/// rejected. Range is left to the backend (1..=10000 on S3/R2).
pub fn parse_part_number(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::invalid(format!("partNumber `{}` is not an integer", raw)))
}

fn object_key(raw: String, field: &str) -> Result<ObjectKey, ApiError> {
    ObjectKey::try_from(raw).map_err(|e| ApiError::invalid(format!("{}: {}", field, e)))
}

/// POST /upload-part form: `name`, `uploadId`, `partNumber` text fields and
/// a `chunk` file part.
#[derive(Debug)]
pub struct UploadPartRequest {
    pub name: ObjectKey,
    pub upload_id: String,
    pub part_number: i32,
    pub chunk: Bytes,
}

#[async_trait]
impl<S> FromRequest<S> for UploadPartRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut form = FormFields::read(req, state).await?;

        let name = object_key(form.text("name")?, "name")?;
        let upload_id = form.text("uploadId")?;
        require_upload_id(&upload_id).map_err(ApiError::InvalidRequest)?;
        let part_number = parse_part_number(&form.text("partNumber")?)?;
        let (_, _, chunk) = form.file("chunk")?;

        Ok(UploadPartRequest {
            name,
            upload_id,
            part_number,
            chunk,
        })
    }
}

/// POST /upload form: a single `file` part whose filename is the object key.
#[derive(Debug)]
pub struct FileUpload {
    pub name: ObjectKey,
    pub content_type: String,
    pub data: Bytes,
}

#[async_trait]
impl<S> FromRequest<S> for FileUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut form = FormFields::read(req, state).await?;

        let (file_name, content_type, data) = form.file("file")?;
        let name = object_key(file_name, "file name")?;
        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Ok(FileUpload {
            name,
            content_type,
            data,
        })
    }
}
