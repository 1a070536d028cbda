//! Snapshot cases: saved app state on disk, for regression checks.
//!
//! A case directory holds `state.json` (state document, defaults excluded)
//! and `storage.json` (storage metadata document).

use std::path::{Path, PathBuf};

use compsync_sync::{diff_documents, DocumentDiff};
use compsync_types::Document;
use tracing::debug;

use crate::app::{App, SavedState};
use crate::error::{RuntimeError, RuntimeResult};

pub const STATE_FILE: &str = "state.json";
pub const STORAGE_FILE: &str = "storage.json";

/// Differences between a stored case and the live app.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseDiff {
    pub state: DocumentDiff,
    pub storage: DocumentDiff,
}

impl CaseDiff {
    pub fn is_empty(&self) -> bool {
        self.state.is_empty() && self.storage.is_empty()
    }
}

/// Save `app` (flushing storage) and write the case files into `dir`.
pub fn write_case(app: &mut App, dir: impl AsRef<Path>) -> RuntimeResult<SavedState> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let saved = app.save(true, false)?;
    write_json(&dir.join(STATE_FILE), &saved.data)?;
    write_json(&dir.join(STORAGE_FILE), &saved.storage)?;
    debug!(dir = %dir.display(), "wrote case");
    Ok(saved)
}

/// Compare the live state of `app` against the case in `dir`.
pub fn check_case(app: &mut App, dir: impl AsRef<Path>) -> RuntimeResult<CaseDiff> {
    let stored = read_case(dir.as_ref())?;
    let current = app.save(true, false)?;
    Ok(CaseDiff {
        state: diff_documents(&stored.data, &current.data),
        storage: diff_documents(&stored.storage, &current.storage),
    })
}

/// Load the case in `dir` into `app`.
pub fn load_case(app: &mut App, dir: impl AsRef<Path>) -> RuntimeResult<()> {
    let stored = read_case(dir.as_ref())?;
    app.load(&stored)
}

fn read_case(dir: &Path) -> RuntimeResult<SavedState> {
    Ok(SavedState {
        data: read_json(dir.join(STATE_FILE))?,
        storage: read_json(dir.join(STORAGE_FILE))?,
    })
}

fn write_json(path: &Path, doc: &Document) -> RuntimeResult<()> {
    let text = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, text)?;
    Ok(())
}

fn read_json(path: PathBuf) -> RuntimeResult<Document> {
    if !path.is_file() {
        return Err(RuntimeError::MissingCaseFile(path));
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}
