use std::fmt;
use std::sync::Arc;

use crate::backend::RemoteBackend;
use crate::cache::LocalCache;

/// Where component storage is flushed to and loaded from.
#[derive(Clone)]
pub enum Persistence {
    /// A remote backend. Without a `file_id` nothing can be loaded and
    /// flushes fail.
    Remote {
        backend: Arc<dyn RemoteBackend>,
        file_id: Option<u64>,
    },
    /// Offline mode: a shared local cache directory.
    Local(LocalCache),
}

impl Persistence {
    pub fn remote(backend: Arc<dyn RemoteBackend>, file_id: u64) -> Self {
        Self::Remote {
            backend,
            file_id: Some(file_id),
        }
    }

    pub fn local(cache: LocalCache) -> Self {
        Self::Local(cache)
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl fmt::Debug for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote { file_id, .. } => f
                .debug_struct("Remote")
                .field("file_id", file_id)
                .finish_non_exhaustive(),
            Self::Local(cache) => f.debug_tuple("Local").field(&cache.dir()).finish(),
        }
    }
}
