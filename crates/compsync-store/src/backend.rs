use compsync_types::ContentHash;

use crate::error::StoreResult;

/// Remote blob persistence, addressed by `(file_id, hash)`.
///
/// All implementations must satisfy these invariants:
/// - Blobs are content-addressed; there is no update in place. Posting the
///   same hash twice stores the same bytes.
/// - Calls may block on the network. An unreachable backend is reported as
///   [`StoreError::BackendUnavailable`](crate::StoreError::BackendUnavailable).
/// - Deleting a hash that does not exist is not an error.
pub trait RemoteBackend: Send + Sync {
    /// Fetch the blob stored under `hash`. `Ok(None)` if it does not exist.
    fn get(&self, file_id: u64, hash: &ContentHash) -> StoreResult<Option<Vec<u8>>>;

    /// Store `bytes` under `hash`.
    fn post(&self, file_id: u64, hash: &ContentHash, bytes: &[u8]) -> StoreResult<()>;

    /// Delete every blob in `hashes`.
    fn delete(&self, file_id: u64, hashes: &[ContentHash]) -> StoreResult<()>;
}
