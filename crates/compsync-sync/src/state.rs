//! State documents: dump a tree to nested JSON and load it back.

use std::ops::ControlFlow;

use compsync_tree::ComponentTree;
use compsync_types::{Document, Handle};
use serde_json::Value;
use tracing::debug;

use crate::error::SyncResult;
use crate::path::{insert_unique, object_ref, prune_empty};

type Visit = SyncResult<ControlFlow<(), Vec<String>>>;

/// Dump every addressable node under `root` into a fresh document.
///
/// With `exclude`, fields equal to the matching entry of that baseline document
/// are dropped, and nodes left with nothing are omitted altogether.
pub fn dump_recursive(
    tree: &mut ComponentTree,
    root: Handle,
    exclude: Option<&Document>,
) -> SyncResult<Document> {
    let mut doc = Document::new();
    let mut namespaces: Vec<Vec<String>> = Vec::new();
    let mut written = 0usize;

    tree.recurse_with(root, Vec::new(), |tree, handle, mut path| -> Visit {
        let node = tree.node(handle)?;
        let local_id = node.local_id().to_string();
        let is_namespace = node.is_namespace() && !local_id.is_empty();

        if is_namespace {
            insert_unique(&mut doc, &path, &local_id, Value::Object(Document::new()))?;
            path.push(local_id.clone());
            namespaces.push(path.clone());
        }
        if local_id.is_empty() {
            return Ok(ControlFlow::Continue(path));
        }

        let Some(mut value) = tree.dump_node(handle)? else {
            return Ok(ControlFlow::Continue(path));
        };
        if let Some(defaults) = exclude
            .and_then(|baseline| object_ref(baseline, &path))
            .and_then(|scope| scope.get(&local_id))
        {
            strip_defaults(&mut value, defaults);
        }
        if is_blank(&value) {
            return Ok(ControlFlow::Continue(path));
        }

        insert_unique(&mut doc, &path, &local_id, value)?;
        written += 1;
        Ok(ControlFlow::Continue(path))
    })?;

    prune_empty(&mut doc, namespaces);
    debug!(%root, written, diffed = exclude.is_some(), "dumped state document");
    Ok(doc)
}

/// Apply `doc` to the tree under `root`.
///
/// A namespace whose key is missing from `doc` is skipped with its whole
/// subtree. Each node's load runs with frontend updates blocked; with
/// `update_frontend` a single refresh is sent afterwards.
pub fn load_recursive(
    tree: &mut ComponentTree,
    root: Handle,
    doc: &Document,
    update_frontend: bool,
) -> SyncResult<()> {
    let mut loaded = 0usize;

    tree.recurse_with(root, Vec::new(), |tree, handle, mut path| -> Visit {
        let node = tree.node(handle)?;
        let local_id = node.local_id().to_string();
        if local_id.is_empty() {
            return Ok(ControlFlow::Continue(path));
        }

        if node.is_namespace() {
            let present = object_ref(doc, &path)
                .and_then(|scope| scope.get(&local_id))
                .is_some_and(Value::is_object);
            if !present {
                return Ok(ControlFlow::Break(()));
            }
            path.push(local_id.clone());
        }

        let Some(value) = object_ref(doc, &path).and_then(|scope| scope.get(&local_id)) else {
            return Ok(ControlFlow::Continue(path));
        };
        {
            let mut guard = tree.block_updates(handle);
            guard.load_node(handle, value.clone())?;
        }
        if update_frontend {
            tree.refresh(handle)?;
        }
        loaded += 1;
        Ok(ControlFlow::Continue(path))
    })?;

    debug!(%root, loaded, "loaded state document");
    Ok(())
}

/// Remove fields of `value` equal to the same field of `defaults`. Non-object
/// values equal to their default become `Null`.
fn strip_defaults(value: &mut Value, defaults: &Value) {
    match (value, defaults) {
        (Value::Object(fields), Value::Object(defaults)) => {
            fields.retain(|key, field| defaults.get(key) != Some(&*field));
        }
        (value, defaults) => {
            if value == defaults {
                *value = Value::Null;
            }
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
