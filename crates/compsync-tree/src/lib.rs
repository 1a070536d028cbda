//! Component tree for compsync.
//!
//! Components live in an arena indexed by [`Handle`](compsync_types::Handle).
//! Parent and child links are handles, never owning references, so the whole
//! structure is released by dropping the [`ComponentTree`].
//!
//! # Key Types
//!
//! - [`NodeRegistry`] -- Handle allocator and weak lookup
//! - [`ComponentTree`] -- Topology, namespaced identity resolution, traversal
//! - [`Handler`] / [`Event`] -- Event callbacks and dispatch
//! - [`AppStatus`] -- Per-tree id index and debug capture flags
//! - [`Frontend`] -- Outgoing renderer notifications
//! - [`UpdateGuard`] -- Scoped suppression of renderer notifications
//!
//! # Invariants
//!
//! - Every node except the root has a parent before its id is resolved.
//! - A resolved full id is cached; two nodes never register the same
//!   non-empty full id.
//! - Event handlers run to completion one at a time; a failing handler never
//!   stops dispatch to the handlers after it.

pub mod describe;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod frontend;
pub mod guard;
pub mod node;
pub mod registry;
pub mod state;
pub mod status;
pub mod tree;

pub use describe::CREATE_SLOT_PREFIX;
pub use dispatch::lifecycle;
pub use error::{TreeError, TreeResult};
pub use event::{EmitOutcome, Event, Handler, HandlerError, HandlerFailure, HandlerResult};
pub use frontend::{Frontend, FrontendUpdate, NullFrontend, RecordingFrontend};
pub use guard::UpdateGuard;
pub use node::{Node, NodeSpec, Slot, SlotFactory, SlotItem, DEFAULT_SLOT};
pub use registry::NodeRegistry;
pub use state::{ComponentState, FieldState};
pub use status::{AppStatus, CapturedEvent};
pub use tree::{ComponentTree, Order, StorageView};
