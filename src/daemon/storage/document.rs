use std::{
    fs::File,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use fs4::fs_std::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

/// A whole JSON document in the application directory, shared by the CLI and the daemon.
///
/// Reads are lock free, the document is only ever replaced by a rename. Writers serialize on an
/// exclusive lock of `<document>.lock`, so a read-modify-write never loses a concurrent update.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: PathBuf,
}

/// Held while a document is modified. Dropping it releases the lock.
struct DocumentLock {
    file: File,
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl JsonDocument {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the document is missing or unreadable. Corruption is logged.
    pub async fn read<T: DeserializeOwned>(&self) -> Option<T> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .inspect_err(|e| warn!("Document {:?} is corrupted: {e}", self.path))
                .ok(),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Can't read {:?}: {e}", self.path);
                None
            }
        }
    }

    pub async fn write<T: Serialize>(&self, value: &T) -> Result<()> {
        let content = serde_json::to_vec_pretty(value)?;
        let _lock = self.lock().await?;
        self.replace(content).await
    }

    /// Applies `change` to the current document under the lock. The document is written back only
    /// when `change` reports a modification. Returns the resulting value either way.
    pub async fn update<T>(&self, change: impl FnOnce(&mut T) -> Result<bool>) -> Result<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let _lock = self.lock().await?;
        let mut value = self.read::<T>().await.unwrap_or_default();
        if change(&mut value)? {
            self.replace(serde_json::to_vec_pretty(&value)?).await?;
        }
        Ok(value)
    }

    async fn lock(&self) -> Result<DocumentLock> {
        let path = self.path.with_extension("lock");
        // flock blocks the thread, keep it off the runtime workers.
        tokio::task::spawn_blocking(move || -> Result<DocumentLock> {
            let file = File::options()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(DocumentLock { file })
        })
        .await?
    }

    /// Writes into a fresh temporary file next to the document and renames it over the document.
    async fn replace(&self, content: Vec<u8>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let dir = path
                .parent()
                .ok_or_else(|| anyhow!("Document {path:?} has no parent directory"))?;
            let mut tmp = NamedTempFile::new_in(dir)?;
            tmp.write_all(&content)?;
            tmp.as_file().sync_data()?;
            tmp.persist(&path)?;
            Ok(())
        })
        .await?
    }
}
