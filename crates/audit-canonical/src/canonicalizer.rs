use serde::Serialize;
use serde_json::{Map, Value};

use crate::digest::Hash;

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// The normalized JSON could not be written out.
    #[error("encoding failed: {0}")]
    Encoding(String),
}

/// Produces the canonical bytes for any serializable value.
///
/// The value is first lowered to a JSON tree through its `Serialize` impl, so
/// renamed fields use their wire names and `#[serde(skip)]` fields never appear.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalizationError> {
    let value = serde_json::to_value(value)
        .map_err(|err| CanonicalizationError::Serialization(err.to_string()))?;
    canonicalize_value(&value)
}

/// Produces the canonical bytes for an already-parsed JSON value.
///
/// Object members whose value is `null` are dropped, remaining keys are emitted
/// in ascending byte order, and no whitespace is written. Empty strings, zero
/// and `false` are kept.
pub fn canonicalize_value(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let normalized = normalize(value);
    serde_json::to_vec(&normalized).map_err(|err| CanonicalizationError::Encoding(err.to_string()))
}

/// SHA-256 over the canonical bytes of `value`.
pub fn hash_canonical<T: Serialize + ?Sized>(value: &T) -> Result<Hash, CanonicalizationError> {
    Ok(Hash::digest(&canonicalize(value)?))
}

// Rebuilds maps by inserting keys in sorted order so the output is ordered
// whether or not serde_json's `preserve_order` feature is active.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(_, child)| !child.is_null()).collect();
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, child) in entries {
                sorted.insert(key.clone(), normalize(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_null_members_only() {
        let value = json!({"a": null, "b": "", "c": 0, "d": false, "e": [null]});
        let bytes = canonicalize_value(&value).unwrap();
        assert_eq!(bytes, br#"{"b":"","c":0,"d":false,"e":[null]}"#.to_vec());
    }

    #[test]
    fn nested_objects_are_sorted() {
        let value = json!({"z": {"y": 1, "x": 2}, "a": [{"k": "v", "b": true}]});
        let bytes = canonicalize_value(&value).unwrap();
        assert_eq!(
            bytes,
            br#"{"a":[{"b":true,"k":"v"}],"z":{"x":2,"y":1}}"#.to_vec()
        );
    }

    #[test]
    fn strings_use_json_escaping() {
        let value = json!({"m": "line\n\"quoted\""});
        let bytes = canonicalize_value(&value).unwrap();
        assert_eq!(bytes, br#"{"m":"line\n\"quoted\""}"#.to_vec());
    }
}
