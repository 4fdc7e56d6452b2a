//! On-disk reference caches for the head pointer and decoded indices.
//!
//! These are treated as external collaborators to the core merge engine;
//! this is a minimal reference instance, not a claim about a production
//! durability story.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use godless_core::{Index, IpfsPath};
use godless_engine::{EngineError, HeadCache, IndexCache};

use crate::error::StoreError;

#[derive(Serialize, Deserialize)]
struct HeadFile {
    head: IpfsPath,
}

/// A head pointer persisted as a single JSON file. `set_head` stages the
/// new value in memory; `commit` is what actually writes it to disk
/// (via a write-to-temp-then-rename, so a crash mid-write never leaves a
/// torn file behind), and `rollback` discards the staged value, re-reading
/// whatever is currently on disk.
///
/// Load reads the file if present; save writes it back on commit,
/// following the narrower `get_head`/`set_head`/`commit`/`rollback`
/// contract.
pub struct FileHeadCache {
    path: PathBuf,
    staged: Mutex<Option<IpfsPath>>,
}

impl FileHeadCache {
    /// Opens (without requiring existence) the head file at `path`. A
    /// missing file reads back as `IpfsPath::NIL`, matching "no index
    /// published yet".
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: Mutex::new(None),
        }
    }

    fn read_committed(&self) -> Result<IpfsPath, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let file: HeadFile = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok(file.head)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IpfsPath::NIL),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn write_committed(&self, head: IpfsPath) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&HeadFile { head })
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[async_trait]
impl HeadCache for FileHeadCache {
    async fn get_head(&self) -> Result<IpfsPath, EngineError> {
        if let Some(staged) = *self.staged.lock() {
            return Ok(staged);
        }
        self.read_committed()
            .map_err(|e| EngineError::HeadCache(e.to_string()))
    }

    async fn set_head(&self, head: IpfsPath) -> Result<(), EngineError> {
        *self.staged.lock() = Some(head);
        Ok(())
    }

    async fn commit(&self) -> Result<(), EngineError> {
        let staged = self.staged.lock().take();
        if let Some(head) = staged {
            self.write_committed(head)
                .map_err(|e| EngineError::HeadCache(e.to_string()))?;
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), EngineError> {
        *self.staged.lock() = None;
        Ok(())
    }
}

/// A decoded-index cache persisted as one JSON file per hash under a
/// directory. A miss (file absent, or present but unreadable) is never
/// fatal — callers always fall back to the object store.
pub struct FileIndexCache {
    dir: PathBuf,
}

impl FileIndexCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, addr: IpfsPath) -> PathBuf {
        self.dir.join(format!("{}.json", addr.to_hex()))
    }
}

#[async_trait]
impl IndexCache for FileIndexCache {
    async fn get_index(&self, addr: IpfsPath) -> Option<Index> {
        let bytes = std::fs::read(self.entry_path(addr)).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(error = %e, "index cache entry corrupt, treating as miss");
                None
            }
        }
    }

    async fn set_index(&self, addr: IpfsPath, idx: Index) -> Result<(), EngineError> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(error = %e, "failed to create index cache directory");
            return Ok(());
        }
        let bytes = match serde_json::to_vec(&idx) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize index for cache write");
                return Ok(());
            }
        };
        if let Err(e) = std::fs::write(self.entry_path(addr), bytes) {
            tracing::warn!(error = %e, "failed to write index cache entry");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn head_cache_reads_nil_before_any_commit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileHeadCache::new(dir.path().join("head.json"));
        assert!(cache.get_head().await.unwrap().is_nil());
    }

    #[tokio::test]
    async fn head_cache_set_is_visible_before_commit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileHeadCache::new(dir.path().join("head.json"));
        let path = IpfsPath::of_bytes(b"head");
        cache.set_head(path).await.unwrap();
        assert_eq!(cache.get_head().await.unwrap(), path);
    }

    #[tokio::test]
    async fn head_cache_rollback_discards_uncommitted_set() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileHeadCache::new(dir.path().join("head.json"));
        cache.set_head(IpfsPath::of_bytes(b"head")).await.unwrap();
        cache.rollback().await.unwrap();
        assert!(cache.get_head().await.unwrap().is_nil());
    }

    #[tokio::test]
    async fn head_cache_survives_reopen_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("head.json");
        let path = IpfsPath::of_bytes(b"head");
        {
            let cache = FileHeadCache::new(&file);
            cache.set_head(path).await.unwrap();
            cache.commit().await.unwrap();
        }
        let reopened = FileHeadCache::new(&file);
        assert_eq!(reopened.get_head().await.unwrap(), path);
    }

    #[tokio::test]
    async fn index_cache_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileIndexCache::new(dir.path());
        let addr = IpfsPath::of_bytes(b"ix");
        assert!(cache.get_index(addr).await.is_none());
        cache.set_index(addr, Index::empty()).await.unwrap();
        assert_eq!(cache.get_index(addr).await, Some(Index::empty()));
    }
}
