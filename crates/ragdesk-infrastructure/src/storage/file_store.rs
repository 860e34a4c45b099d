//! Directory-backed key/value store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ragdesk_core::error::{RagDeskError, Result};
use ragdesk_core::storage::KeyValueStore;

use super::atomic_file::AtomicFile;

/// Stores each key as one `<key>.json` file inside a base directory.
///
/// Directory structure:
/// ```text
/// base_dir/
/// ├── ragdesk.conversations.json
/// └── ragdesk.chat_history.json   (legacy, removed after migration)
/// ```
///
/// File I/O runs on the blocking pool so callers never stall the runtime.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Maps a key to its file, replacing characters unsafe in file names.
    fn file_for(&self, key: &str) -> AtomicFile {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        AtomicFile::new(self.base_dir.join(format!("{sanitized}.json")))
    }

    async fn run_blocking<T, F>(&self, key: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(AtomicFile) -> std::result::Result<T, super::AtomicFileError> + Send + 'static,
    {
        let file = self.file_for(key);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || op(file))
            .await
            .map_err(|e| RagDeskError::internal(format!("Failed to join storage task: {}", e)))?
            .map_err(|e| RagDeskError::storage(format!("key '{}': {}", key, e)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.run_blocking(key, |file| file.load()).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let value = value.to_string();
        self.run_blocking(key, move |file| file.save(&value)).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.run_blocking(key, |file| file.remove()).await
    }
}
