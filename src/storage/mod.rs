//! Storage backend abstraction

mod memory;
mod s3;
mod traits;

pub use memory::MemoryBackend;
pub use s3::S3Backend;
pub use traits::{StorageBackend, StorageError};

use crate::config::BackendConfig;
use std::sync::Arc;

/// Build the configured backend behind a shared trait object.
pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    Ok(match config {
        BackendConfig::R2 { .. } => Arc::new(S3Backend::new(config)?),
        BackendConfig::Memory { min_part_size } => {
            Arc::new(MemoryBackend::with_min_part_size(*min_part_size))
        }
    })
}
