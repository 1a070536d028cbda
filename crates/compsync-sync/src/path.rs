//! Navigation of nested documents by namespace path.

use compsync_types::{Document, SEPARATOR};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};

/// Object at `path`, or `None` if any segment is missing or not an object.
pub fn object_ref<'a>(doc: &'a Document, path: &[String]) -> Option<&'a Document> {
    let mut current = doc;
    for segment in path {
        current = current.get(segment)?.as_object()?;
    }
    Some(current)
}

fn object_mut<'a>(doc: &'a mut Document, path: &[String]) -> Option<&'a mut Document> {
    let mut current = doc;
    for segment in path {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    Some(current)
}

/// Object at `path`, creating empty objects for missing segments.
pub fn object_at<'a>(doc: &'a mut Document, path: &[String]) -> SyncResult<&'a mut Document> {
    let mut current = doc;
    for (depth, segment) in path.iter().enumerate() {
        current = match current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Document::new()))
        {
            Value::Object(map) => map,
            _ => {
                return Err(SyncError::DuplicateKey {
                    key: dotted(&path[..=depth], None),
                })
            }
        };
    }
    Ok(current)
}

/// Dotted form of `path` plus an optional final key.
pub fn dotted(path: &[String], key: Option<&str>) -> String {
    let mut parts: Vec<&str> = path.iter().map(String::as_str).collect();
    parts.extend(key);
    let separator = SEPARATOR.to_string();
    parts.join(separator.as_str())
}

/// Insert `key -> value` into the object at `path`, failing if the key is taken.
pub fn insert_unique(doc: &mut Document, path: &[String], key: &str, value: Value) -> SyncResult<()> {
    let target = object_at(doc, path)?;
    if target.contains_key(key) {
        return Err(SyncError::DuplicateKey {
            key: dotted(path, Some(key)),
        });
    }
    target.insert(key.to_string(), value);
    Ok(())
}

/// Remove the objects at `namespaces` that ended up empty, deepest first.
pub fn prune_empty(doc: &mut Document, mut namespaces: Vec<Vec<String>>) {
    namespaces.sort_by_key(|path| std::cmp::Reverse(path.len()));
    for path in namespaces {
        let Some((key, parent)) = path.split_last() else {
            continue;
        };
        let Some(parent) = object_mut(doc, parent) else {
            continue;
        };
        if parent
            .get(key)
            .and_then(Value::as_object)
            .is_some_and(Document::is_empty)
        {
            parent.remove(key);
        }
    }
}
