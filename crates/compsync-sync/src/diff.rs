//! Path-level comparison of two documents.
//!
//! Nested objects are flattened into dotted paths (`form.length.value`) and
//! the resulting leaf maps are compared key by key.

use std::collections::BTreeMap;
use std::fmt;

use compsync_types::{Document, SEPARATOR};
use serde::Serialize;
use serde_json::Value;

/// The result of comparing two documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DocumentDiff {
    pub changes: Vec<DocumentChange>,
}

impl DocumentDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn additions(&self) -> usize {
        self.count(|c| matches!(c, DocumentChange::Added { .. }))
    }

    pub fn removals(&self) -> usize {
        self.count(|c| matches!(c, DocumentChange::Removed { .. }))
    }

    pub fn modifications(&self) -> usize {
        self.count(|c| matches!(c, DocumentChange::Modified { .. }))
    }

    fn count(&self, pred: impl Fn(&DocumentChange) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(c)).count()
    }
}

/// One differing leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "lowercase")]
pub enum DocumentChange {
    Added { path: String, value: Value },
    Removed { path: String, value: Value },
    Modified { path: String, old: Value, new: Value },
}

impl DocumentChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Modified { path, .. } => path,
        }
    }
}

impl fmt::Display for DocumentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { path, value } => write!(f, "+ {path}: {value}"),
            Self::Removed { path, value } => write!(f, "- {path}: {value}"),
            Self::Modified { path, old, new } => write!(f, "~ {path}: {old} -> {new}"),
        }
    }
}

/// Compare `old` and `new`, reporting changes sorted by path.
pub fn diff_documents(old: &Document, new: &Document) -> DocumentDiff {
    let old = flatten(old);
    let new = flatten(new);
    let mut changes = Vec::new();

    for (path, old_val) in &old {
        match new.get(path) {
            Some(new_val) if new_val != old_val => changes.push(DocumentChange::Modified {
                path: path.clone(),
                old: (*old_val).clone(),
                new: (*new_val).clone(),
            }),
            Some(_) => {}
            None => changes.push(DocumentChange::Removed {
                path: path.clone(),
                value: (*old_val).clone(),
            }),
        }
    }
    for (path, new_val) in &new {
        if !old.contains_key(path) {
            changes.push(DocumentChange::Added {
                path: path.clone(),
                value: (*new_val).clone(),
            });
        }
    }

    changes.sort_by(|a, b| a.path().cmp(b.path()));
    DocumentDiff { changes }
}

/// Leaves of `doc` by dotted path. Empty objects count as leaves.
fn flatten(doc: &Document) -> BTreeMap<String, &Value> {
    let mut out = BTreeMap::new();
    flatten_into(doc, "", &mut out);
    out
}

fn flatten_into<'a>(doc: &'a Document, prefix: &str, out: &mut BTreeMap<String, &'a Value>) {
    for (key, value) in doc {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{SEPARATOR}{key}")
        };
        match value {
            Value::Object(map) if !map.is_empty() => flatten_into(map, &path, out),
            leaf => {
                out.insert(path, leaf);
            }
        }
    }
}
