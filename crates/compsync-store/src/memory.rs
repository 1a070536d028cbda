use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use compsync_types::ContentHash;

use crate::backend::RemoteBackend;
use crate::error::{StoreError, StoreResult};

/// In-memory, HashMap-based remote backend.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` and
/// cloned on read/write. The backend can be switched offline to exercise the
/// unavailable-backend paths of a flush.
pub struct InMemoryBackend {
    blobs: RwLock<HashMap<(u64, ContentHash), Vec<u8>>>,
    online: AtomicBool,
    posts: AtomicUsize,
    deletes: AtomicUsize,
}

impl InMemoryBackend {
    /// Create a new empty, reachable backend.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
            posts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent call fail with `BackendUnavailable` (or succeed again).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Returns `true` if `hash` is stored under `file_id`.
    pub fn contains(&self, file_id: u64, hash: &ContentHash) -> bool {
        self.blobs
            .read()
            .expect("lock poisoned")
            .contains_key(&(file_id, *hash))
    }

    /// Total number of successful `post` calls.
    pub fn post_count(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    /// Total number of hashes passed to successful `delete` calls.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::BackendUnavailable("backend offline".into()))
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteBackend for InMemoryBackend {
    fn get(&self, file_id: u64, hash: &ContentHash) -> StoreResult<Option<Vec<u8>>> {
        self.check_online()?;
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(&(file_id, *hash)).cloned())
    }

    fn post(&self, file_id: u64, hash: &ContentHash, bytes: &[u8]) -> StoreResult<()> {
        self.check_online()?;
        let mut map = self.blobs.write().expect("lock poisoned");
        map.insert((file_id, *hash), bytes.to_vec());
        self.posts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, file_id: u64, hashes: &[ContentHash]) -> StoreResult<()> {
        self.check_online()?;
        let mut map = self.blobs.write().expect("lock poisoned");
        for hash in hashes {
            map.remove(&(file_id, *hash));
        }
        self.deletes.fetch_add(hashes.len(), Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("blob_count", &self.len())
            .field("online", &self.online.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::ContentHasher;

    fn hash(data: &[u8]) -> ContentHash {
        ContentHasher::STORAGE.hash("owner", data)
    }

    #[test]
    fn post_and_get() {
        let backend = InMemoryBackend::new();
        let h = hash(b"hello");
        backend.post(1, &h, b"hello").unwrap();
        assert_eq!(backend.get(1, &h).unwrap(), Some(b"hello".to_vec()));
        assert_eq!(backend.post_count(), 1);
    }

    #[test]
    fn file_ids_are_separate_namespaces() {
        let backend = InMemoryBackend::new();
        let h = hash(b"x");
        backend.post(1, &h, b"x").unwrap();
        assert!(backend.get(2, &h).unwrap().is_none());
    }

    #[test]
    fn delete_missing_is_not_an_error() {
        let backend = InMemoryBackend::new();
        let h = hash(b"never-written");
        backend.delete(1, &[h]).unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn offline_backend_fails_every_call() {
        let backend = InMemoryBackend::new();
        backend.set_online(false);
        let h = hash(b"x");
        assert!(matches!(
            backend.post(1, &h, b"x"),
            Err(StoreError::BackendUnavailable(_))
        ));
        assert!(backend.get(1, &h).is_err());
        assert!(backend.delete(1, &[h]).is_err());
        assert_eq!(backend.post_count(), 0);

        backend.set_online(true);
        backend.post(1, &h, b"x").unwrap();
        assert!(backend.contains(1, &h));
    }

    #[test]
    fn debug_format() {
        let backend = InMemoryBackend::new();
        let debug = format!("{backend:?}");
        assert!(debug.contains("InMemoryBackend"));
        assert!(debug.contains("blob_count"));
    }
}
