use compsync_types::TypeTag;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// A decoded storage value, tagged by how it is encoded.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    /// Raw bytes, stored verbatim.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// JSON document, stored compact.
    Json(Value),
    /// Bincode-encoded Rust value; decode with [`StoredValue::decode_opaque`].
    Opaque(Vec<u8>),
}

impl StoredValue {
    /// Serialize an arbitrary value into an opaque blob.
    pub fn opaque<T: Serialize>(value: &T) -> StoreResult<Self> {
        bincode::serialize(value)
            .map(Self::Opaque)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// The tag recorded in metadata for this value.
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Bytes(_) => TypeTag::Bytes,
            Self::Text(_) => TypeTag::Text,
            Self::Json(_) => TypeTag::Json,
            Self::Opaque(_) => TypeTag::Opaque,
        }
    }

    /// Encode into the bytes that get hashed and persisted.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        match self {
            Self::Bytes(b) | Self::Opaque(b) => Ok(b.clone()),
            Self::Text(s) => Ok(s.as_bytes().to_vec()),
            Self::Json(v) => {
                serde_json::to_vec(v).map_err(|e| StoreError::Serialization(e.to_string()))
            }
        }
    }

    /// Decode persisted bytes according to `tag`. `key` is only used for
    /// error context.
    pub fn decode(key: &str, bytes: Vec<u8>, tag: TypeTag) -> StoreResult<Self> {
        let fail = |reason: String| StoreError::Decode {
            key: key.to_string(),
            tag,
            reason,
        };
        match tag {
            TypeTag::Bytes => Ok(Self::Bytes(bytes)),
            TypeTag::Opaque => Ok(Self::Opaque(bytes)),
            TypeTag::Text => String::from_utf8(bytes)
                .map(Self::Text)
                .map_err(|e| fail(e.to_string())),
            TypeTag::Json => serde_json::from_slice(&bytes)
                .map(Self::Json)
                .map_err(|e| fail(e.to_string())),
        }
    }

    /// Decode an opaque blob back into a Rust value.
    pub fn decode_opaque<T: DeserializeOwned>(&self) -> StoreResult<T> {
        match self {
            Self::Opaque(bytes) => bincode::deserialize(bytes).map_err(|e| StoreError::Decode {
                key: String::new(),
                tag: TypeTag::Opaque,
                reason: e.to_string(),
            }),
            other => Err(StoreError::Decode {
                key: String::new(),
                tag: other.tag(),
                reason: "value is not opaque".into(),
            }),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for StoredValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Value> for StoredValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Mesh {
        vertices: Vec<(f32, f32)>,
        name: String,
    }

    #[test]
    fn text_decodes_as_text() {
        let v = StoredValue::from("héllo");
        let bytes = v.encode().unwrap();
        assert_eq!(
            StoredValue::decode("k", bytes, TypeTag::Text).unwrap(),
            v
        );
    }

    #[test]
    fn json_is_compact() {
        let v = StoredValue::from(json!({"a": [1, 2]}));
        assert_eq!(v.encode().unwrap(), br#"{"a":[1,2]}"#.to_vec());
    }

    #[test]
    fn corrupt_text_is_a_decode_error() {
        let err = StoredValue::decode("k", vec![0xff, 0xfe], TypeTag::Text).unwrap_err();
        assert!(matches!(err, StoreError::Decode { tag: TypeTag::Text, .. }));
    }

    #[test]
    fn corrupt_json_is_a_decode_error() {
        let err = StoredValue::decode("cfg", b"{not json".to_vec(), TypeTag::Json).unwrap_err();
        match err {
            StoreError::Decode { key, tag, .. } => {
                assert_eq!(key, "cfg");
                assert_eq!(tag, TypeTag::Json);
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn opaque_values_survive_encoding() {
        let mesh = Mesh {
            vertices: vec![(0.0, 1.0), (2.5, -1.0)],
            name: "square".into(),
        };
        let stored = StoredValue::opaque(&mesh).unwrap();
        assert_eq!(stored.tag(), TypeTag::Opaque);
        let bytes = stored.encode().unwrap();
        let back = StoredValue::decode("mesh", bytes, TypeTag::Opaque).unwrap();
        assert_eq!(back.decode_opaque::<Mesh>().unwrap(), mesh);
    }

    #[test]
    fn decode_opaque_rejects_other_tags() {
        let v = StoredValue::from("text");
        assert!(v.decode_opaque::<String>().is_err());
    }
}
