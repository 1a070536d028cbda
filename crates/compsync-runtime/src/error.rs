//! Error types for the runtime.

use std::path::PathBuf;

use compsync_tree::HandlerFailure;

/// Errors from sessions, reloads, configuration, and snapshot cases.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// One or more `save` handlers failed; storage was not fully flushed.
    #[error("save failed for {} component(s): {}", .failures.len(), summarize(.failures))]
    SaveFailed { failures: Vec<HandlerFailure> },

    /// The configuration is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// A snapshot case file is missing.
    #[error("case file not found: {}", .0.display())]
    MissingCaseFile(PathBuf),

    /// Tree operation failed.
    #[error("tree error: {0}")]
    Tree(#[from] compsync_tree::TreeError),

    /// Document sync failed.
    #[error("sync error: {0}")]
    Sync(#[from] compsync_sync::SyncError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Store(#[from] compsync_store::StoreError),

    /// TOML parsing failed.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn summarize(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for runtime results.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
