//! Batch metadata handling: canonical serialization and the idempotency
//! hash.
//!
//! Metadata is an opaque JSON payload at the engine level; each handler
//! deserializes it into its own typed struct. The active-uniqueness
//! constraint hashes the canonical form so key order never affects
//! deduplication.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A typed batch payload. Implementors name the `batch_type` their handler
/// is registered under; serialization produces the stored metadata.
pub trait BatchPayload: Serialize {
    const BATCH_TYPE: &'static str;

    fn to_metadata(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Serialize a JSON value with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// SHA-256 of the canonical form, hex-encoded. This is the idempotency key
/// paired with `batch_type` in the active-uniqueness index.
pub fn metadata_hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_under_key_order() {
        let a = json!({"artist_id": "A", "offset": 0, "limit": 50});
        let b = json!({"limit": 50, "artist_id": "A", "offset": 0});
        assert_eq!(metadata_hash(&a), metadata_hash(&b));
    }

    #[test]
    fn hash_differs_on_value_change() {
        let a = json!({"artist_id": "A", "offset": 0});
        let b = json!({"artist_id": "A", "offset": 50});
        assert_ne!(metadata_hash(&a), metadata_hash(&b));
    }

    #[test]
    fn canonical_json_sorts_nested_objects() {
        let value = json!({"b": {"z": 1, "a": [2, {"y": 3, "x": 4}]}, "a": null});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":null,"b":{"a":[2,{"x":4,"y":3}],"z":1}}"#
        );
    }
}
