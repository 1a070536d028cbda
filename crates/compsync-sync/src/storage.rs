//! Storage metadata documents.
//!
//! Laid out like the state document; each addressable node with storage
//! contributes `local_id -> {key: {key, hash, size, type}}`.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use compsync_store::StorageMetadata;
use compsync_tree::ComponentTree;
use compsync_types::{Document, Handle};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::path::{dotted, insert_unique, object_ref, prune_empty};

/// Marker key of a leaf that carries in-memory data next to its metadata.
pub const HAVE_DATA: &str = "_have_data";

type Visit = SyncResult<ControlFlow<(), Vec<String>>>;

/// Dump storage metadata of every node under `root`.
///
/// With `include_data`, leaves become
/// `{"_have_data": true, "data": {key: hex}, "metadata": {..}}` so unflushed
/// values survive a tree rebuild.
pub fn dump_storage(tree: &mut ComponentTree, root: Handle, include_data: bool) -> SyncResult<Document> {
    let mut doc = Document::new();
    let mut namespaces: Vec<Vec<String>> = Vec::new();

    tree.recurse_with(root, Vec::new(), |tree, handle, mut path| -> Visit {
        let node = tree.node(handle)?;
        let local_id = node.local_id().to_string();

        if node.is_namespace() && !local_id.is_empty() {
            insert_unique(&mut doc, &path, &local_id, Value::Object(Document::new()))?;
            path.push(local_id.clone());
            namespaces.push(path.clone());
        }

        let store = node.storage();
        if store.metadata().is_empty() {
            return Ok(ControlFlow::Continue(path));
        }
        if local_id.is_empty() {
            return Err(SyncError::UnaddressableStorage {
                handle,
                component: node.component().to_string(),
            });
        }

        let metadata = to_value(&path, &local_id, store.metadata())?;
        let leaf = if include_data {
            json!({
                HAVE_DATA: true,
                "data": store.dump_data(),
                "metadata": metadata,
            })
        } else {
            metadata
        };
        insert_unique(&mut doc, &path, &local_id, leaf)?;
        Ok(ControlFlow::Continue(path))
    })?;

    prune_empty(&mut doc, namespaces);
    debug!(%root, include_data, "dumped storage document");
    Ok(doc)
}

/// Restore storage metadata (and carried data) from a storage document.
pub fn load_storage(tree: &mut ComponentTree, root: Handle, doc: &Document) -> SyncResult<()> {
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

        let Some(entry) = object_ref(doc, &path).and_then(|scope| scope.get(&local_id)) else {
            return Ok(ControlFlow::Continue(path));
        };
        let key = dotted(&path, Some(&local_id));
        let (metadata, data) = if entry.get(HAVE_DATA).and_then(Value::as_bool) == Some(true) {
            let metadata = entry.get("metadata").cloned().unwrap_or(Value::Null);
            let data: BTreeMap<String, String> = match entry.get("data") {
                Some(data) => serde_json::from_value(data.clone()).map_err(|e| malformed(&key, e))?,
                None => BTreeMap::new(),
            };
            (metadata, Some(data))
        } else {
            (entry.clone(), None)
        };
        let metadata: StorageMetadata =
            serde_json::from_value(metadata).map_err(|e| malformed(&key, e))?;

        let mut storage = tree.storage(handle)?;
        storage.load_metadata(metadata);
        if let Some(data) = data {
            storage.load_data(data)?;
        }
        Ok(ControlFlow::Continue(path))
    })?;
    debug!(%root, "loaded storage document");
    Ok(())
}

fn to_value(path: &[String], local_id: &str, metadata: &StorageMetadata) -> SyncResult<Value> {
    serde_json::to_value(metadata).map_err(|e| malformed(&dotted(path, Some(local_id)), e))
}

fn malformed(key: &str, err: serde_json::Error) -> SyncError {
    SyncError::Malformed {
        key: key.to_string(),
        reason: err.to_string(),
    }
}
