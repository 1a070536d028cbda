use std::collections::BTreeMap;

use compsync_types::{ContentHash, TypeTag};
use serde::{Deserialize, Serialize};

use crate::hasher::ContentHasher;

/// Metadata for one key of a component's storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub key: String,
    pub hash: ContentHash,
    pub size: u64,
    #[serde(rename = "type")]
    pub tag: TypeTag,
}

/// All storage entries of one component, keyed by storage key.
///
/// Serializes as a plain `{key: {key, hash, size, type}}` map, which is the
/// leaf format of the storage metadata document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageMetadata {
    entries: BTreeMap<String, StorageEntry>,
}

impl StorageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&StorageEntry> {
        self.entries.get(key)
    }

    /// Record `encoded` under `key` and return the new entry's hash.
    pub fn set(&mut self, key: &str, encoded: &[u8], tag: TypeTag, owner: &str) -> ContentHash {
        let hash = ContentHasher::STORAGE.hash(owner, encoded);
        self.entries.insert(
            key.to_string(),
            StorageEntry {
                key: key.to_string(),
                hash,
                size: encoded.len() as u64,
                tag,
            },
        );
        hash
    }

    pub fn remove(&mut self, key: &str) -> Option<StorageEntry> {
        self.entries.remove(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &StorageEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
