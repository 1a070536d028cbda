//! Sync engine for compsync.
//!
//! Converts a live component tree into nested documents keyed by component id
//! and applies such documents back onto a tree.
//!
//! # Key Types
//!
//! - [`dump_recursive`] / [`load_recursive`] -- State document, with optional exclude-default diffing
//! - [`dump_storage`] / [`load_storage`] -- Parallel storage metadata document
//! - [`DocumentDiff`] / [`DocumentChange`] -- Path-level comparison of two documents
//!
//! # Document Layout
//!
//! A namespace node opens a nested object under its local id; everything its
//! subtree writes (including the namespace node's own entry) lands inside that
//! object. Other nodes write `local_id -> value` into the enclosing object.
//! Nodes without an id are never written but their children are.

pub mod diff;
pub mod error;
pub mod path;
pub mod state;
pub mod storage;

pub use diff::{diff_documents, DocumentChange, DocumentDiff};
pub use error::{SyncError, SyncResult};
pub use state::{dump_recursive, load_recursive};
pub use storage::{dump_storage, load_storage, HAVE_DATA};
