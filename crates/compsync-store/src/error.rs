use compsync_types::{ContentHash, TypeError, TypeTag};

/// Errors from component storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Stored bytes could not be decoded with the entry's type tag.
    #[error("cannot decode storage key {key:?} as {tag}: {reason}")]
    Decode {
        key: String,
        tag: TypeTag,
        reason: String,
    },

    /// A value could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The remote backend could not be reached or refused the request.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The store has no owner id yet, so no content hash can be computed.
    #[error("storage for key {key:?} has no owner id (component not attached)")]
    MissingOwner { key: String },

    /// A blob the metadata refers to is missing from the persistence target.
    #[error("blob {0} not found in persistence")]
    MissingBlob(ContentHash),

    /// Malformed identifier or tag in storage metadata.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// I/O error from the local cache directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
