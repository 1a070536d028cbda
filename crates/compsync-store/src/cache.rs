//! Local content-addressed cache directory.
//!
//! One file per content hash, named by the hash's hex form. Files are written
//! once through a temporary file and an atomic no-clobber rename, so several
//! stores (or processes) can share the directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use compsync_types::ContentHash;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::StoreResult;

/// A blob file found in the cache directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub hash: ContentHash,
    pub size: u64,
}

/// Handle to a local cache directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Use `dir` as the cache root. The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `hash`.
    pub fn path_for(&self, hash: &ContentHash) -> PathBuf {
        self.dir.join(hash.to_hex())
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.path_for(hash).is_file()
    }

    /// Read the blob for `hash`, or `None` if it is not cached.
    pub fn read(&self, hash: &ContentHash) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(hash)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `bytes` under `hash` unless a file for it already exists.
    ///
    /// Returns `true` if a new file was written.
    pub fn write_if_absent(&self, hash: &ContentHash, bytes: &[u8]) -> StoreResult<bool> {
        let target = self.path_for(hash);
        if target.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        match tmp.persist_noclobber(&target) {
            Ok(_) => {
                debug!(hash = %hash.short_hex(), size = bytes.len(), "wrote cache blob");
                Ok(true)
            }
            // Another writer won the race; the content is identical by construction.
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error.into()),
        }
    }

    /// List every blob in the cache. Files whose names are not content hashes
    /// are ignored.
    pub fn list(&self) -> StoreResult<Vec<CacheEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "cache walk failed"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Ok(hash) = ContentHash::from_hex(name) else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(CacheEntry { hash, size });
        }
        entries.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::ContentHasher;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("blobs"));
        let hash = ContentHasher::STORAGE.hash("o", b"abc");

        assert!(cache.read(&hash).unwrap().is_none());
        assert!(cache.write_if_absent(&hash, b"abc").unwrap());
        assert!(cache.contains(&hash));
        assert_eq!(cache.read(&hash).unwrap(), Some(b"abc".to_vec()));
    }

    #[test]
    fn second_write_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path());
        let hash = ContentHasher::STORAGE.hash("o", b"abc");

        assert!(cache.write_if_absent(&hash, b"abc").unwrap());
        assert!(!cache.write_if_absent(&hash, b"abc").unwrap());
        assert_eq!(cache.list().unwrap().len(), 1);
    }

    #[test]
    fn list_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path());
        let hash = ContentHasher::STORAGE.hash("o", b"12345");
        cache.write_if_absent(&hash, b"12345").unwrap();
        fs::write(dir.path().join("README"), b"not a blob").unwrap();

        let entries = cache.list().unwrap();
        assert_eq!(entries, vec![CacheEntry { hash, size: 5 }]);
    }

    #[test]
    fn list_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("nope"));
        assert!(cache.list().unwrap().is_empty());
    }
}
