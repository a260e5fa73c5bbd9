//! Mock uploader for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::upload::Uploader;

/// Mock implementation of the [`Uploader`] trait.
pub struct MockUploader {
    result: Mutex<(bool, String)>,
    uploads: Mutex<Vec<PathBuf>>,
}

impl Default for MockUploader {
    fn default() -> Self {
        Self {
            result: Mutex::new((true, "uploaded".to_string())),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the result returned by subsequent uploads.
    pub fn set_result(&self, success: bool, message: &str) {
        *self.result.lock().unwrap() = (success, message.to_string());
    }

    /// Paths passed to `upload`, in call order.
    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, path: &Path) -> (bool, String) {
        self.uploads.lock().unwrap().push(path.to_path_buf());
        self.result.lock().unwrap().clone()
    }
}
