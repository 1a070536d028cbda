//! Error types for the sync engine.

use compsync_types::Handle;

/// Errors from dumping or loading documents.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Two nodes wrote the same key into one document object.
    #[error("duplicate key {key:?} in document")]
    DuplicateKey { key: String },

    /// A node without an id holds storage entries.
    #[error("component {handle} ({component}) has storage but no id")]
    UnaddressableStorage { handle: Handle, component: String },

    /// A document entry does not have the expected shape.
    #[error("malformed document entry {key:?}: {reason}")]
    Malformed { key: String, reason: String },

    /// Tree operation failed.
    #[error("tree error: {0}")]
    Tree(#[from] compsync_tree::TreeError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Store(#[from] compsync_store::StoreError),
}

/// Convenience alias for sync results.
pub type SyncResult<T> = Result<T, SyncError>;
