//! Blob references inside a storage metadata document.

use compsync_store::StorageEntry;
use compsync_sync::HAVE_DATA;
use compsync_types::{Document, SEPARATOR};
use serde_json::Value;

/// One storage entry found in a document, with the dotted path of its owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobRef {
    pub owner: String,
    pub entry: StorageEntry,
}

/// Every storage entry in `doc`, in document order.
///
/// Both plain metadata leaves and the `_have_data` leaves written by hot
/// reload are understood.
pub fn collect_refs(doc: &Document) -> Vec<BlobRef> {
    let mut out = Vec::new();
    walk(doc, "", &mut out);
    out
}

fn walk(doc: &Document, prefix: &str, out: &mut Vec<BlobRef>) {
    if doc.get(HAVE_DATA).is_some() {
        if let Some(Value::Object(metadata)) = doc.get("metadata") {
            walk(metadata, prefix, out);
        }
        return;
    }
    for (key, value) in doc {
        let Value::Object(map) = value else {
            continue;
        };
        if let Ok(entry) = serde_json::from_value::<StorageEntry>(value.clone()) {
            out.push(BlobRef {
                owner: prefix.to_string(),
                entry,
            });
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{SEPARATOR}{key}")
        };
        walk(map, &path, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HASH_A: &str = "aa00000000000000000000000000000000000000000000000000000000000000";
    const HASH_B: &str = "bb00000000000000000000000000000000000000000000000000000000000000";

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn finds_entries_under_namespaces() {
        let storage = doc(json!({
            "viewer": {"image": {"key": "image", "hash": HASH_A, "size": 3, "type": "bytes"}},
            "form": {
                "notes": {"text": {"key": "text", "hash": HASH_B, "size": 5, "type": "str"}}
            }
        }));
        let refs = collect_refs(&storage);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].owner, "form.notes");
        assert_eq!(refs[0].entry.key, "text");
        assert_eq!(refs[1].owner, "viewer");
        assert_eq!(refs[1].entry.hash.to_hex(), HASH_A);
    }

    #[test]
    fn reads_metadata_of_data_leaves() {
        let storage = doc(json!({
            "viewer": {
                "_have_data": true,
                "data": {"image": "010203"},
                "metadata": {"image": {"key": "image", "hash": HASH_A, "size": 3, "type": "bytes"}}
            }
        }));
        let refs = collect_refs(&storage);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].owner, "viewer");
    }

    #[test]
    fn ignores_non_entries() {
        let storage = doc(json!({"a": 1, "b": {"c": "text"}, "d": {}}));
        assert!(collect_refs(&storage).is_empty());
    }
}
