//! Synchronized list codec
//!
//! The external store holds each resource class as one flat JSON array of
//! alternating resource ids and enabled flags:
//!
//! ```text
//! ["id0", 1, "id1", 0, ...]
//! ```
//!
//! The format is chosen to minimize bytes against the store's small quota.
//! Flags are written as `1`/`0` but any truthy number or boolean decodes as
//! enabled.

use bytes::Bytes;
use serde_json::Value;

use super::error::CodecError;

/// One decoded resource-state record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub id: String,
    pub enabled: bool,
}

impl ResourceEntry {
    pub fn new(id: impl Into<String>, enabled: bool) -> Self {
        Self {
            id: id.into(),
            enabled,
        }
    }
}

/// Decodes a raw store item into resource-state records.
///
/// An absent item decodes as the empty list.
pub fn decode(raw: Option<&Bytes>) -> Result<Vec<ResourceEntry>, CodecError> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };

    let value: Value = serde_json::from_slice(raw)
        .map_err(|error| CodecError::InvalidJson(error.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(CodecError::NotAnArray),
    };

    let mut entries = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let Some(id_slot) = iter.next() {
        let id = match id_slot {
            Value::String(id) => id,
            other => return Err(CodecError::InvalidId(other.to_string())),
        };
        let flag_slot = iter.next().ok_or_else(|| CodecError::DanglingId(id.clone()))?;
        let enabled = match flag_slot {
            Value::Number(number) => number.as_f64().unwrap_or(0.0) != 0.0,
            Value::Bool(flag) => flag,
            other => return Err(CodecError::InvalidFlag(other.to_string())),
        };
        entries.push(ResourceEntry { id, enabled });
    }

    Ok(entries)
}

/// Encodes resource-state records back into the flat-array item.
pub fn encode(entries: &[ResourceEntry]) -> Bytes {
    let mut items = Vec::with_capacity(entries.len() * 2);
    for entry in entries {
        items.push(Value::String(entry.id.clone()));
        items.push(Value::from(if entry.enabled { 1 } else { 0 }));
    }

    // a vec of JSON scalars always serializes
    Bytes::from(serde_json::to_vec(&Value::Array(items)).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_absent_is_empty() {
        assert_eq!(decode(None).unwrap(), Vec::new());
    }

    #[test]
    fn test_decode_pairs() {
        let raw = Bytes::from_static(br#"["u1", 1, "u2", 0]"#);
        assert_eq!(
            decode(Some(&raw)).unwrap(),
            vec![ResourceEntry::new("u1", true), ResourceEntry::new("u2", false)]
        );
    }

    #[test]
    fn test_encode_decode_symmetric() {
        let entries = vec![
            ResourceEntry::new("a", true),
            ResourceEntry::new("b", false),
            ResourceEntry::new("c", true),
        ];
        assert_eq!(decode(Some(&encode(&entries))).unwrap(), entries);
    }

    #[test]
    fn test_encode_is_compact() {
        let raw = encode(&[ResourceEntry::new("u1", true)]);
        assert_eq!(&raw[..], br#"["u1",1]"#);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        let raw = Bytes::from_static(br#"["u1", 1, "u2"]"#);
        assert_eq!(
            decode(Some(&raw)).unwrap_err(),
            CodecError::DanglingId("u2".into())
        );
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let raw = Bytes::from_static(br#"{"u1": 1}"#);
        assert_eq!(decode(Some(&raw)).unwrap_err(), CodecError::NotAnArray);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let raw = Bytes::from_static(b"not json");
        assert!(matches!(
            decode(Some(&raw)),
            Err(CodecError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_string_id() {
        let raw = Bytes::from_static(br#"[7, 1]"#);
        assert!(matches!(decode(Some(&raw)), Err(CodecError::InvalidId(_))));
    }
}
