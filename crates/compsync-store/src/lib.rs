//! Content-addressed component storage for compsync.
//!
//! Every component owns a [`ContentStore`]: a key → blob map meant for payloads
//! too large for the state document (meshes, images, result files). Blobs are
//! addressed by a BLAKE3 hash over the owner's full id and the encoded bytes,
//! so the same content under two owners never shares an address.
//!
//! # Persistence
//!
//! A store is flushed against a [`Persistence`] target:
//!
//! - [`Persistence::Remote`] -- a [`RemoteBackend`] keyed by `(file_id, hash)`
//! - [`Persistence::Local`] -- a [`LocalCache`] directory with one file per hash
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written; overwriting a key writes a new blob and
//!    schedules the old hash for deletion.
//! 2. Flushes are incremental: only keys marked dirty since the last successful
//!    flush are persisted.
//! 3. A failed flush leaves the dirty set untouched, so retrying is safe.
//! 4. Decode failures are surfaced to the caller, never swallowed.

pub mod backend;
pub mod cache;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod metadata;
pub mod persistence;
pub mod store;
pub mod value;

pub use backend::RemoteBackend;
pub use cache::{CacheEntry, LocalCache};
pub use error::{StoreError, StoreResult};
pub use hasher::ContentHasher;
pub use memory::InMemoryBackend;
pub use metadata::{StorageEntry, StorageMetadata};
pub use persistence::Persistence;
pub use store::{ContentStore, FlushReport};
pub use value::StoredValue;
