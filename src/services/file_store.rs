//! Directory-backed key-value store, one JSON file per key

use std::path::PathBuf;
use futures::future::{BoxFuture, FutureExt};
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;
use super::KeyValueStore;

/// Stores each key as `<dir>/<key>.json`, replacing files atomically
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        async move {
            let path = self.path_for(key)?;
            match fs::read_to_string(&path).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let path = self.path_for(key)?;
            fs::create_dir_all(&self.dir).await?;

            // Write beside the target then rename so readers never see a torn file
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, value.as_bytes()).await?;
            fs::rename(&tmp, &path).await?;

            debug!("Wrote {} bytes to {}", value.len(), path.display());
            Ok(())
        }
        .boxed()
    }
}
