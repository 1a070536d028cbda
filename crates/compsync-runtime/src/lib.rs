//! Runtime for compsync.
//!
//! Ties a [`ComponentTree`](compsync_tree::ComponentTree) to a persistence
//! target and drives whole-tree operations: save, load, and hot reload.
//!
//! # Key Types
//!
//! - [`App`] -- A live tree with its root and recorded default state
//! - [`SavedState`] -- State and storage documents produced by a save
//! - [`RuntimeConfig`] -- TOML configuration (cache directory, storage mode, capture flags)
//! - [`ChangeSource`] -- Source of code-change notifications for [`watch_and_reload`]
//!
//! # Design Rules
//!
//! 1. Defaults are recorded once, right after the tree is built.
//! 2. A reload captures the old tree completely before the new one is built.
//! 3. Reloads triggered by the watch loop run strictly one at a time.

pub mod app;
pub mod case;
pub mod config;
pub mod error;
pub mod reload;

pub use app::{App, SavedState};
pub use case::{check_case, load_case, write_case, CaseDiff, STATE_FILE, STORAGE_FILE};
pub use config::{RuntimeConfig, StorageMode};
pub use error::{RuntimeError, RuntimeResult};
pub use reload::{channel, watch_and_reload, ChangeSender, ChangeSource, ChannelChangeSource};
