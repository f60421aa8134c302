//! Persistent backend: one JSON file per key in a shared directory.
//!
//! Every cache instance on the host pointing at the same directory sees the
//! same entries. When no usable directory exists the backend is unavailable
//! and behaves as an always-empty store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::cache::backend::{decode_entry, StorageBackend};
use crate::cache::sync::ChangePublisher;
use crate::cache::{BackendKind, CacheEntry};
use crate::error::Result;

const FILE_PREFIX: &str = "cache_";
const FILE_SUFFIX: &str = ".json";

#[derive(Debug)]
pub struct PersistentBackend {
    dir: Option<PathBuf>,
    publisher: Option<ChangePublisher>,
}

impl PersistentBackend {
    /// Opens (creating if needed) the store directory.
    ///
    /// Falls back to an unavailable backend if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match std::fs::create_dir_all(&dir) {
            Ok(()) => Self {
                dir: Some(dir),
                publisher: None,
            },
            Err(err) => {
                warn!(
                    "Persistent cache directory {} unavailable, degrading to no-op: {}",
                    dir.display(),
                    err
                );
                Self::unavailable()
            }
        }
    }

    /// A backend with no storage behind it.
    pub fn unavailable() -> Self {
        Self {
            dir: None,
            publisher: None,
        }
    }

    /// Announces writes and deletes to other contexts through `publisher`.
    pub fn with_publisher(mut self, publisher: ChangePublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn is_available(&self) -> bool {
        self.dir.is_some()
    }

    fn path_for(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{}{}{}", FILE_PREFIX, hex::encode(key), FILE_SUFFIX))
    }

    fn key_of(file_name: &str) -> Option<String> {
        let encoded = file_name
            .strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)?;
        String::from_utf8(hex::decode(encoded).ok()?).ok()
    }

    fn notify(&self, key: Option<&str>) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(key);
        }
    }
}

async fn remove_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl StorageBackend for PersistentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let path = Self::path_for(dir, key);

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == ErrorKind::InvalidData => None,
            Err(err) => return Err(err.into()),
        };

        match raw.as_deref().and_then(|raw| decode_entry(key, raw)) {
            Some(entry) => Ok(Some(entry)),
            None => {
                warn!("Removing corrupt persisted cache entry '{}'", key);
                remove_file(&path).await?;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = Self::path_for(dir, key);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec(&entry)?).await?;
        fs::rename(&tmp, &path).await?;

        self.notify(Some(key));
        Ok(())
    }

    /// Hit counts are not persisted: a read never rewrites the file or
    /// publishes a change.
    async fn touch(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let Some(dir) = &self.dir else {
            return Ok(false);
        };

        let removed = remove_file(&Self::path_for(dir, key)).await?;
        if removed {
            self.notify(Some(key));
        }
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let Some(dir) = &self.dir else {
            return Ok(Vec::new());
        };

        let mut read_dir = match fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        while let Some(item) = read_dir.next_entry().await? {
            if let Some(key) = item.file_name().to_str().and_then(Self::key_of) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let keys = self.keys().await?;
        for key in &keys {
            remove_file(&Self::path_for(dir, key)).await?;
        }
        debug!("Cleared {} persisted cache entries", keys.len());

        self.notify(None);
        Ok(())
    }
}
