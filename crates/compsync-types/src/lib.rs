//! Foundation types for compsync.
//!
//! This crate provides the small identity and addressing types shared by every
//! other compsync crate. It has no notion of a component tree; it only knows
//! how things are named and addressed.
//!
//! # Key Types
//!
//! - [`Handle`] -- Process-stable integer handle of a live component
//! - [`ContentHash`] -- Owner-scoped BLAKE3 content address of a stored blob
//! - [`TypeTag`] -- How stored bytes are decoded back into a value
//! - [`Document`] -- Nested JSON mapping used for dump/load payloads
//! - [`validate_local_id`] / [`join_full_id`] -- Identifier rules

pub mod error;
pub mod handle;
pub mod hash;
pub mod ident;
pub mod tag;

pub use error::TypeError;
pub use handle::Handle;
pub use hash::ContentHash;
pub use ident::{join_full_id, validate_local_id, SEPARATOR};
pub use tag::TypeTag;

/// A nested dump/load document: string keys mapping to component payloads or
/// to nested documents at namespace boundaries.
pub type Document = serde_json::Map<String, serde_json::Value>;
