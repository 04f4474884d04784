//! Upload API request handlers
//!
//! Split into submodules by domain:
//! - `multipart` - initiate, upload-part, complete and abort
//! - `object` - single-shot upload of a small file
//! - `status` - health check

mod multipart;
mod object;
mod status;

use super::errors::ApiError;
use crate::upload::Uploader;

pub use multipart::{abort_upload, complete_upload, initiate_upload, upload_part};
pub use object::upload_file;
pub use status::{health_check, HealthResponse};

/// Application state shared across handlers
pub struct AppState {
    pub uploader: Uploader,
    /// Backend label reported by /health ("r2" or "memory")
    pub backend: &'static str,
}

impl AppState {
    pub fn new(uploader: Uploader, backend: &'static str) -> Self {
        Self { uploader, backend }
    }
}
