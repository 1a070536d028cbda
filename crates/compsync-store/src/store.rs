//! Per-component content store with incremental flushing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use compsync_types::{ContentHash, TypeTag};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::metadata::StorageMetadata;
use crate::persistence::Persistence;
use crate::value::StoredValue;

/// What a single [`ContentStore::flush`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Hashes deleted on the remote backend.
    pub deleted: usize,
    /// Blobs uploaded to the remote backend.
    pub uploaded: usize,
    /// Blobs newly written to the local cache.
    pub written: usize,
    /// Blobs already present in the local cache.
    pub skipped: usize,
}

impl FlushReport {
    /// Returns `true` if the flush touched no storage at all.
    pub fn is_noop(&self) -> bool {
        self.deleted == 0 && self.uploaded == 0 && self.written == 0
    }

    /// Sum two reports, for aggregating over a tree.
    pub fn merge(&mut self, other: FlushReport) {
        self.deleted += other.deleted;
        self.uploaded += other.uploaded;
        self.written += other.written;
        self.skipped += other.skipped;
    }
}

/// Key → blob storage owned by a single component.
///
/// Values are kept encoded in memory; `get` decodes them with the tag recorded
/// in metadata. The owner id must be bound (via [`ContentStore::set_owner`])
/// before anything can be `set`, because it scopes every content hash.
#[derive(Debug, Default)]
pub struct ContentStore {
    owner: Option<String>,
    data: HashMap<String, Vec<u8>>,
    metadata: StorageMetadata,
    needs_deletion: Vec<ContentHash>,
    needs_save: BTreeSet<String>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the owning component's full id.
    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = Some(owner.into());
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn metadata(&self) -> &StorageMetadata {
        &self.metadata
    }

    /// Keys changed since the last successful flush.
    pub fn dirty_keys(&self) -> impl Iterator<Item = &str> {
        self.needs_save.iter().map(String::as_str)
    }

    /// Hashes queued for deletion on the next flush.
    pub fn pending_deletions(&self) -> &[ContentHash] {
        &self.needs_deletion
    }

    /// Returns `true` if a flush has anything to do.
    pub fn is_dirty(&self) -> bool {
        !self.needs_save.is_empty() || !self.needs_deletion.is_empty()
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Get the value stored under `key`, loading it from `persistence` if it
    /// is not in memory yet.
    pub fn get(&mut self, key: &str, persistence: &Persistence) -> StoreResult<Option<StoredValue>> {
        if !self.data.contains_key(key) {
            self.load(key, persistence)?;
        }
        let Some(bytes) = self.data.get(key) else {
            return Ok(None);
        };
        let tag = self.metadata.get(key).map_or(TypeTag::Bytes, |e| e.tag);
        StoredValue::decode(key, bytes.clone(), tag).map(Some)
    }

    /// Get an opaque value and decode it into `T`.
    pub fn get_opaque<T: DeserializeOwned>(
        &mut self,
        key: &str,
        persistence: &Persistence,
    ) -> StoreResult<Option<T>> {
        match self.get(key, persistence)? {
            Some(value) => value.decode_opaque().map(Some),
            None => Ok(None),
        }
    }

    fn load(&mut self, key: &str, persistence: &Persistence) -> StoreResult<()> {
        let Some(entry) = self.metadata.get(key) else {
            return Ok(());
        };
        let hash = entry.hash;
        let bytes = match persistence {
            Persistence::Local(cache) => cache.read(&hash)?,
            Persistence::Remote { backend, file_id } => {
                let Some(file_id) = file_id else {
                    return Ok(());
                };
                backend.get(*file_id, &hash)?
            }
        };
        match bytes {
            Some(bytes) => {
                debug!(key, hash = %hash.short_hex(), "loaded storage blob");
                self.data.insert(key.to_string(), bytes);
                self.needs_save.remove(key);
                Ok(())
            }
            None => Err(StoreError::MissingBlob(hash)),
        }
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Store `value` under `key`.
    ///
    /// Returns `false` if the encoded bytes and tag are identical to what is
    /// already cached for `key` (nothing is marked dirty in that case).
    pub fn set(&mut self, key: &str, value: impl Into<StoredValue>) -> StoreResult<bool> {
        let value = value.into();
        let encoded = value.encode()?;
        let tag = value.tag();

        let unchanged = self.data.get(key) == Some(&encoded)
            && self.metadata.get(key).is_some_and(|e| e.tag == tag);
        if unchanged {
            return Ok(false);
        }

        let owner = self.owner.as_deref().ok_or_else(|| StoreError::MissingOwner {
            key: key.to_string(),
        })?;
        let old_hash = self.metadata.get(key).map(|e| e.hash);
        let new_hash = self.metadata.set(key, &encoded, tag, owner);
        self.data.insert(key.to_string(), encoded);
        self.needs_save.insert(key.to_string());

        self.needs_deletion.retain(|h| *h != new_hash);
        if let Some(old) = old_hash.filter(|old| *old != new_hash) {
            self.queue_deletion(old);
        }
        debug!(key, hash = %new_hash.short_hex(), "storage key updated");
        Ok(true)
    }

    /// Serialize `value` opaquely and store it under `key`.
    pub fn set_opaque<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<bool> {
        self.set(key, StoredValue::opaque(value)?)
    }

    /// Remove `key` and schedule its blob for deletion.
    pub fn delete(&mut self, key: &str) {
        self.data.remove(key);
        if let Some(entry) = self.metadata.remove(key) {
            self.queue_deletion(entry.hash);
        }
        self.needs_save.remove(key);
    }

    /// Queue `hash` for deletion unless another key still refers to it.
    fn queue_deletion(&mut self, hash: ContentHash) {
        if self.metadata.entries().any(|e| e.hash == hash) || self.needs_deletion.contains(&hash) {
            return;
        }
        self.needs_deletion.push(hash);
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    /// Persist every dirty key and issue queued deletions.
    ///
    /// On error the dirty set is left untouched; calling `flush` again retries
    /// the whole flush.
    pub fn flush(&mut self, persistence: &Persistence) -> StoreResult<FlushReport> {
        if !self.is_dirty() {
            return Ok(FlushReport::default());
        }
        let report = match persistence {
            Persistence::Remote { backend, file_id } => {
                let file_id = file_id.ok_or_else(|| {
                    StoreError::BackendUnavailable("no file id configured".into())
                })?;
                let mut report = FlushReport::default();
                if !self.needs_deletion.is_empty() {
                    backend.delete(file_id, &self.needs_deletion)?;
                    report.deleted = self.needs_deletion.len();
                    self.needs_deletion.clear();
                }
                for key in &self.needs_save {
                    let (Some(entry), Some(bytes)) = (self.metadata.get(key), self.data.get(key))
                    else {
                        warn!(key = %key, "dirty storage key has no data; skipping upload");
                        continue;
                    };
                    backend.post(file_id, &entry.hash, bytes)?;
                    report.uploaded += 1;
                }
                report
            }
            Persistence::Local(cache) => {
                let mut report = FlushReport::default();
                for key in &self.needs_save {
                    let (Some(entry), Some(bytes)) = (self.metadata.get(key), self.data.get(key))
                    else {
                        continue;
                    };
                    if cache.write_if_absent(&entry.hash, bytes)? {
                        report.written += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                if !self.needs_deletion.is_empty() {
                    debug!(
                        count = self.needs_deletion.len(),
                        "local cache is append-only; dropping queued deletions"
                    );
                    self.needs_deletion.clear();
                }
                report
            }
        };
        self.needs_save.clear();
        debug!(owner = ?self.owner, ?report, "storage flushed");
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Document support
    // -----------------------------------------------------------------------

    /// Replace metadata with `metadata` (as read from a storage document).
    ///
    /// Cached values whose hash no longer matches are dropped so they are
    /// re-read on demand.
    pub fn load_metadata(&mut self, metadata: StorageMetadata) {
        self.data.retain(|key, _| {
            metadata.get(key).map(|e| e.hash) == self.metadata.get(key).map(|e| e.hash)
        });
        self.metadata = metadata;
        self.needs_save.clear();
        self.needs_deletion.clear();
    }

    /// In-memory values as hex strings, for carrying unflushed data across a reload.
    pub fn dump_data(&self) -> BTreeMap<String, String> {
        self.data
            .iter()
            .map(|(k, v)| (k.clone(), hex::encode(v)))
            .collect()
    }

    /// Restore in-memory values produced by [`ContentStore::dump_data`].
    ///
    /// Restored keys that have not been flushed yet are marked dirty again.
    pub fn load_data(&mut self, data: BTreeMap<String, String>, persistence: &Persistence) -> StoreResult<()> {
        for (key, hex_value) in data {
            let bytes = hex::decode(&hex_value).map_err(|e| StoreError::Decode {
                key: key.clone(),
                tag: TypeTag::Bytes,
                reason: e.to_string(),
            })?;
            if let Some(entry) = self.metadata.get(&key) {
                if !is_persisted(persistence, &entry.hash) {
                    self.needs_save.insert(key.clone());
                }
            }
            self.data.insert(key, bytes);
        }
        Ok(())
    }
}

fn is_persisted(persistence: &Persistence, hash: &ContentHash) -> bool {
    match persistence {
        Persistence::Local(cache) => cache.contains(hash),
        // Remote state is unknown without a round-trip; re-uploading is idempotent.
        Persistence::Remote { .. } => false,
    }
}
