//! API error type and JSON error responses

use crate::storage::StorageError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Body returned for every request that fails boundary validation.
pub const BAD_REQUEST_MESSAGE: &str = "Bad Request";

/// Upload API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing field, wrong type or unreadable body. The detail is logged,
    /// the client only sees `{"message": "Bad Request"}`.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Bad-request body
#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

/// Storage failure envelope
#[derive(Debug, Serialize)]
struct StorageErrorBody {
    message: String,
    code: String,
}

impl ApiError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        ApiError::InvalidRequest(detail.into())
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Storage(StorageError::NoSuchUpload(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(StorageError::Rejected { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Storage(StorageError::S3(_)) | ApiError::Storage(StorageError::Other(_)) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::InvalidRequest(detail) => {
                debug!("Rejected request: {}", detail);
                (
                    status,
                    Json(MessageBody {
                        message: BAD_REQUEST_MESSAGE,
                    }),
                )
                    .into_response()
            }
            ApiError::PayloadTooLarge => (
                status,
                Json(MessageBody {
                    message: "Payload Too Large",
                }),
            )
                .into_response(),
            ApiError::Storage(err) => {
                warn!("Storage call failed: {}", err);
                let body = StorageErrorBody {
                    code: err.code().to_string(),
                    message: err.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_request_body_is_fixed() {
        let response = ApiError::invalid("missing field `name`").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"message": "Bad Request"})
        );
    }

    #[tokio::test]
    async fn test_no_such_upload_is_404_with_code() {
        let response =
            ApiError::from(StorageError::NoSuchUpload("abc".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NoSuchUpload");
        assert!(body["message"].as_str().unwrap().contains("abc"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StorageError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (
                StorageError::rejected("EntityTooSmall", "too small"),
                StatusCode::BAD_REQUEST,
            ),
            (StorageError::S3("timeout".into()), StatusCode::BAD_GATEWAY),
            (StorageError::Other("boom".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }
}
