//! Upload collaborator interface.
//!
//! Delivery of the output artifact to the sales platform lives outside the
//! core; the orchestrator only hands over the file path and logs the result.

use async_trait::async_trait;
use std::path::Path;

/// Trait for the bulk-upload collaborator.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload the artifact at `path`. Returns (success, message).
    async fn upload(&self, path: &Path) -> (bool, String);
}
