//! Error types for the component tree.

use compsync_types::{Handle, TypeError};

/// Errors from tree construction, identity resolution, and storage access.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Identity was requested for a node that was never attached.
    #[error("parent of component {handle} is not set")]
    MissingParent { handle: Handle },

    /// A local id contains the namespace separator.
    #[error("invalid component id {0:?}: ids cannot contain '.'")]
    InvalidIdentifier(String),

    /// Two nodes resolved to the same full id.
    #[error("duplicate component id {full_id:?} (already used by {existing}, requested by {requested})")]
    DuplicateIdentifier {
        full_id: String,
        existing: Handle,
        requested: Handle,
    },

    /// The handle does not refer to a live node.
    #[error("no component with handle {0}")]
    UnknownNode(Handle),

    /// A component constructor failed.
    #[error("construction of {component} failed: {reason}")]
    Construction { component: String, reason: String },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Store(#[from] compsync_store::StoreError),
}

impl From<TypeError> for TreeError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidIdentifier(id) => Self::InvalidIdentifier(id),
            other => Self::Store(compsync_store::StoreError::Type(other)),
        }
    }
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
