//! File-backed key-value store.
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a sibling temp file
//! which is synced and then renamed over the target, so a crash mid-write
//! leaves the previous value intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use avatar_core::error::{AvatarError, Result};
use avatar_core::traits::KeyValueStore;

/// Directory-backed store, one file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            AvatarError::Storage(format!("Failed to create store directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    /// Returns the root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(AvatarError::Storage("Store key cannot be empty".into()));
    }
    if key.starts_with('.') {
        return Err(AvatarError::Storage(format!("Store key cannot start with '.': {}", key)));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(AvatarError::Storage(format!(
            "Store key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;

        match fs::read_to_string(&path).await {
            Ok(contents) => {
                debug!(path = ?path, bytes = contents.len(), "Read store value");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AvatarError::Io(e)),
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &path).await?;

        debug!(path = ?path, bytes = value.len(), "Wrote store value");
        Ok(())
    }
}
