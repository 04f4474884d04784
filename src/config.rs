//! Configuration for the file_drop upload gateway

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// S3/R2 minimum size for every part except the last one.
pub const DEFAULT_MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Bucket every upload lands in
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Storage backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Maximum request body size in bytes (one part or one single-shot file)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: u64,

    /// Log level filter string.
    /// Set via config file or FD_LOG_LEVEL env var. Overridden by RUST_LOG.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Cloudflare R2 (or any S3-compatible endpoint) for production use
    R2 {
        /// Cloudflare account id; the endpoint is derived from it
        #[serde(default)]
        account_id: Option<String>,

        /// Explicit endpoint URL (MinIO, LocalStack). Takes precedence over account_id.
        #[serde(default)]
        endpoint: Option<String>,

        /// Signing region; R2 expects "auto"
        #[serde(default = "default_region")]
        region: String,

        /// Use path-style URLs (required for MinIO, LocalStack)
        #[serde(default)]
        force_path_style: bool,

        #[serde(default)]
        access_key_id: Option<String>,

        #[serde(default)]
        secret_access_key: Option<String>,
    },

    /// In-process store for local development and tests
    Memory {
        /// Minimum size of every part except the last one
        #[serde(default = "default_min_part_size")]
        min_part_size: u64,
    },
}

// Default value functions for serde
fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_bucket() -> String {
    "file-drop".to_string()
}

fn default_max_body_size() -> u64 {
    128 * 1024 * 1024 // 128MB
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_min_part_size() -> u64 {
    DEFAULT_MIN_PART_SIZE
}

fn default_log_level() -> String {
    "file_drop=debug,tower_http=debug".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::R2 {
            account_id: None,
            endpoint: None,
            region: default_region(),
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            bucket: default_bucket(),
            backend: BackendConfig::default(),
            max_body_size: default_max_body_size(),
            log_level: default_log_level(),
        }
    }
}

impl BackendConfig {
    /// Resolve the endpoint URL for the R2 backend.
    ///
    /// An explicit `endpoint` wins; otherwise the Cloudflare account endpoint
    /// `https://<account_id>.r2.cloudflarestorage.com` is used.
    pub fn endpoint_url(&self) -> Result<String, ConfigError> {
        match self {
            BackendConfig::R2 {
                endpoint: Some(ep), ..
            } => Ok(ep.clone()),
            BackendConfig::R2 {
                account_id: Some(id),
                ..
            } if !id.is_empty() => Ok(format!("https://{}.r2.cloudflarestorage.com", id)),
            BackendConfig::R2 { .. } => Err(ConfigError::Invalid(
                "R2 backend requires ACCOUNT_ID or an explicit endpoint".to_string(),
            )),
            BackendConfig::Memory { .. } => Err(ConfigError::Invalid(
                "memory backend has no endpoint".to_string(),
            )),
        }
    }

    /// Short label for logs and /health
    pub fn label(&self) -> &'static str {
        match self {
            BackendConfig::R2 { .. } => "r2",
            BackendConfig::Memory { .. } => "memory",
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup (the process
    /// environment in production, a map in tests).
    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = var("FD_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.listen_addr = parsed;
            }
        }

        if let Some(bucket) = var("FD_BUCKET") {
            config.bucket = bucket;
        }

        if let Some(size) = var("FD_MAX_BODY_SIZE") {
            if let Ok(parsed) = size.parse() {
                config.max_body_size = parsed;
            }
        }

        if var("FD_BACKEND").as_deref() == Some("memory") {
            config.backend = BackendConfig::Memory {
                min_part_size: var("FD_MIN_PART_SIZE")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MIN_PART_SIZE),
            };
        } else {
            config.backend = BackendConfig::R2 {
                account_id: var("ACCOUNT_ID"),
                endpoint: var("FD_S3_ENDPOINT"),
                region: var("FD_S3_REGION").unwrap_or_else(default_region),
                force_path_style: var("FD_S3_PATH_STYLE")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
                access_key_id: var("ACCESS_KEY_ID"),
                secret_access_key: var("SECRET_ACCESS_KEY"),
            };
        }

        if let Some(level) = var("FD_LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Load configuration from file if it exists, otherwise from environment.
    ///
    /// A file named by `FD_CONFIG` must load; a missing or malformed one is an
    /// error rather than a silent fallback to the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    fn load_with<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("FD_CONFIG") {
            return Self::from_file(&path).map_err(|e| match e {
                ConfigError::Io(msg) => ConfigError::Io(format!("FD_CONFIG {}: {}", path, msg)),
                ConfigError::Parse(msg) => {
                    ConfigError::Parse(format!("FD_CONFIG {}: {}", path, msg))
                }
                other => other,
            });
        }

        for path in &["file_drop.toml", "/etc/file_drop/config.toml"] {
            if std::path::Path::new(path).exists() {
                if let Ok(config) = Self::from_file(path) {
                    return Ok(config);
                }
            }
        }

        Ok(Self::from_lookup(var))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
