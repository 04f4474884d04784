//! Shared test infrastructure for integration tests
//!
//! Provides TestServer (memory and R2-compatible backends), multipart form
//! helpers, data generators, and MinIO availability gating.

#![allow(dead_code)]

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use rand::{Rng, SeedableRng};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Port counter to avoid conflicts between tests.
static PORT_COUNTER: AtomicU16 = AtomicU16::new(19400);

/// MinIO configuration constants
pub const MINIO_ENDPOINT: &str = "http://localhost:9000";
pub const MINIO_BUCKET: &str = "file-drop-test";
pub const MINIO_ACCESS_KEY: &str = "minioadmin";
pub const MINIO_SECRET_KEY: &str = "minioadmin";

/// Test server wrapper that spawns a real file_drop binary
pub struct TestServer {
    process: Child,
    port: u16,
    _config_dir: TempDir,
    bucket: String,
}

impl TestServer {
    // ── Factory methods ──

    /// Start a test server with the in-memory backend (no Docker needed).
    /// Parts of any size are accepted so tests can stay small.
    pub async fn memory() -> Self {
        Self::memory_with_min_part_size(0).await
    }

    /// Start a test server with the in-memory backend and a minimum part size
    pub async fn memory_with_min_part_size(min_part_size: u64) -> Self {
        let config = format!(
            "[backend]\ntype = \"memory\"\nmin_part_size = {}\n",
            min_part_size
        );
        Self::spawn_with_config(&config, "file-drop").await
    }

    /// Start a test server with the R2 backend pointed at MinIO
    pub async fn minio() -> Self {
        let config = format!(
            concat!(
                "[backend]\n",
                "type = \"r2\"\n",
                "endpoint = \"{}\"\n",
                "region = \"us-east-1\"\n",
                "force_path_style = true\n",
                "access_key_id = \"{}\"\n",
                "secret_access_key = \"{}\"\n",
            ),
            MINIO_ENDPOINT, MINIO_ACCESS_KEY, MINIO_SECRET_KEY,
        );
        Self::spawn_with_config(&config, MINIO_BUCKET).await
    }

    // ── Shared spawn logic ──

    /// Allocate a port, write a TOML config, spawn the server and wait for
    /// readiness. All factory methods delegate here.
    async fn spawn_with_config(config_body: &str, bucket: &str) -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
        let config_dir = TempDir::new().expect("Failed to create temp dir");

        let full_config = format!(
            "listen_addr = \"127.0.0.1:{}\"\nbucket = \"{}\"\n{}",
            port, bucket, config_body
        );
        let config_path = config_dir.path().join("test.toml");
        std::fs::write(&config_path, &full_config).expect("Failed to write test config");

        let process = Command::new(env!("CARGO_BIN_EXE_file_drop"))
            .env("FD_CONFIG", &config_path)
            .env("RUST_LOG", "file_drop=warn")
            .spawn()
            .expect("Failed to start server");

        let mut server = Self {
            process,
            port,
            _config_dir: config_dir,
            bucket: bucket.to_string(),
        };
        server.wait_ready().await;
        server
    }

    // ── Instance methods ──

    async fn wait_ready(&mut self) {
        let addr = format!("127.0.0.1:{}", self.port);
        for _ in 0..150 {
            if std::net::TcpStream::connect(&addr).is_ok() {
                sleep(Duration::from_millis(100)).await;
                return;
            }

            if let Ok(Some(status)) = self.process.try_wait() {
                panic!("Server exited before becoming ready: {}", status);
            }

            sleep(Duration::from_millis(100)).await;
        }

        let _ = self.process.kill();
        panic!("Timed out waiting for server on {}", addr);
    }

    /// Get the HTTP endpoint URL
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// URL for an API path such as "/upload-part"
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint(), path)
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

// === Shared HTTP helpers (reqwest) ===

/// POST a JSON body and return (status, parsed JSON body).
pub async fn post_json(client: &reqwest::Client, url: &str, body: Value) -> (u16, Value) {
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("POST failed");
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

/// POST a multipart form and return (status, parsed JSON body).
pub async fn post_form(client: &reqwest::Client, url: &str, form: Form) -> (u16, Value) {
    let resp = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .expect("POST failed");
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

/// Form for POST /upload-part
pub fn part_form(name: &str, upload_id: &str, part_number: i32, chunk: Vec<u8>) -> Form {
    Form::new()
        .text("name", name.to_string())
        .text("uploadId", upload_id.to_string())
        .text("partNumber", part_number.to_string())
        .part("chunk", Part::bytes(chunk).file_name("blob"))
}

/// Form for POST /upload
pub fn file_form(file_name: &str, content_type: &str, data: Vec<u8>) -> Form {
    let part = Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_str(content_type)
        .expect("valid mime type");
    Form::new().part("file", part)
}

/// Run initiate, one upload-part per chunk, and complete through the HTTP API.
/// Returns the completion response body.
pub async fn multipart_upload(
    client: &reqwest::Client,
    server: &TestServer,
    key: &str,
    chunks: Vec<Vec<u8>>,
) -> Value {
    let (status, init) = post_json(
        client,
        &server.url("/initiate-upload"),
        serde_json::json!({"name": key}),
    )
    .await;
    assert_eq!(status, 200, "initiate failed: {}", init);
    let upload_id = init["uploadId"].as_str().expect("uploadId").to_string();

    let mut meta = Vec::new();
    for (i, chunk) in chunks.into_iter().enumerate() {
        let part_number = i as i32 + 1;
        let (status, part) = post_form(
            client,
            &server.url("/upload-part"),
            part_form(key, &upload_id, part_number, chunk),
        )
        .await;
        assert_eq!(status, 200, "upload-part {} failed: {}", part_number, part);
        meta.push(part);
    }

    let (status, done) = post_json(
        client,
        &server.url("/complete-upload"),
        serde_json::json!({"name": key, "uploadId": upload_id, "meta": meta}),
    )
    .await;
    assert_eq!(status, 200, "complete failed: {}", done);
    done
}

// === Data generators ===

/// Generate deterministic binary data
pub fn generate_binary(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; size];
    rng.fill(&mut data[..]);
    data
}

// === MinIO gating ===

/// Create an S3 client pointing directly at MinIO (not through file_drop)
pub async fn minio_client() -> Client {
    let credentials = Credentials::new(MINIO_ACCESS_KEY, MINIO_SECRET_KEY, None, None, "test");
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .endpoint_url(MINIO_ENDPOINT)
        .credentials_provider(credentials)
        .force_path_style(true)
        .build();
    Client::from_conf(config)
}

/// Check if MinIO is available (TCP probe + HeadBucket with 2s timeout)
pub async fn minio_available() -> bool {
    // Quick TCP check first
    if std::net::TcpStream::connect("localhost:9000").is_err() {
        return false;
    }

    let client = minio_client().await;

    // Verify the specific test bucket exists (not just any S3-compatible service)
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        client.head_bucket().bucket(MINIO_BUCKET).send(),
    )
    .await;
    matches!(result, Ok(Ok(_)))
}

/// Macro to skip a test if MinIO is not available.
/// Use at the start of any test that requires MinIO.
#[macro_export]
macro_rules! skip_unless_minio {
    () => {
        if !common::minio_available().await {
            eprintln!("MinIO not available, skipping test");
            return;
        }
    };
}
