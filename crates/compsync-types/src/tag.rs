use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How the bytes of a storage entry are decoded on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// Raw bytes, returned as-is.
    #[serde(rename = "bytes")]
    Bytes,
    /// UTF-8 text.
    #[serde(rename = "str")]
    Text,
    /// A JSON document. `dict` and `list` are accepted for older metadata.
    #[serde(rename = "json", alias = "dict", alias = "list")]
    Json,
    /// An opaque serialized Rust value (bincode).
    #[serde(rename = "pickle")]
    Opaque,
}

impl TypeTag {
    /// Wire name of the tag, as written into storage metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bytes => "bytes",
            Self::Text => "str",
            Self::Json => "json",
            Self::Opaque => "pickle",
        }
    }

    /// Parse a wire name, accepting the legacy `dict`/`list` spellings.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s {
            "bytes" => Ok(Self::Bytes),
            "str" => Ok(Self::Text),
            "json" | "dict" | "list" => Ok(Self::Json),
            "pickle" => Ok(Self::Opaque),
            other => Err(TypeError::UnknownTypeTag(other.to_string())),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_display() {
        for tag in [TypeTag::Bytes, TypeTag::Text, TypeTag::Json, TypeTag::Opaque] {
            assert_eq!(TypeTag::parse(&tag.to_string()).unwrap(), tag);
        }
    }

    #[test]
    fn legacy_json_names() {
        assert_eq!(TypeTag::parse("dict").unwrap(), TypeTag::Json);
        let tag: TypeTag = serde_json::from_str("\"list\"").unwrap();
        assert_eq!(tag, TypeTag::Json);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert_eq!(
            TypeTag::parse("ndarray"),
            Err(TypeError::UnknownTypeTag("ndarray".into()))
        );
        assert!(serde_json::from_str::<TypeTag>("\"ndarray\"").is_err());
    }
}
