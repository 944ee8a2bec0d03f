//! Deterministic canonicalization of event payloads.
//!
//! `canonicalize` produces byte-exact output such that two semantically
//! equal payloads — equal after dropping null-valued keys — serialize
//! identically regardless of input key order. The `__canon_v` version tag
//! is inserted as an ordinary key and sorted into place rather than
//! special-cased as a prefix, so canonicalization stays one uniform
//! sorted-byte rule instead of needing a locale-specific exception for it.
//!
//! `serde_json::Map`'s iteration order depends on whether the crate's
//! `preserve_order` feature is enabled anywhere in the dependency graph.
//! To stay correct either way, every map this module produces is built by
//! inserting entries in already-sorted order rather than relying on the
//! map's own ordering behavior.

use ledger_contracts::error::{LedgerError, LedgerResult};
use serde_json::{Map, Value};

/// Version tag prepended (in sorted position) to every canonicalized
/// payload.
const CANON_VERSION_KEY: &str = "__canon_v";
const CANON_VERSION: i64 = 1;

/// Canonicalize `payload` to its deterministic byte representation.
///
/// `payload` must be a JSON object at the top level — the ledger's payload
/// schemas are all mappings. Returns `LedgerError::CanonicalizationError`
/// otherwise.
pub fn canonicalize(payload: &Value) -> LedgerResult<Vec<u8>> {
    let value = canonical_value(payload)?;
    serde_json::to_vec(&value).map_err(|e| LedgerError::CanonicalizationError {
        reason: format!("failed to serialize canonical value: {e}"),
    })
}

/// Re-parse canonicalized bytes back into a `Value`, used only to exercise
/// the idempotence property.
pub fn parse(bytes: &[u8]) -> LedgerResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::CanonicalizationError {
        reason: format!("failed to parse canonical bytes: {e}"),
    })
}

/// Build the canonical `Value` for `payload`: null-pruned, version-tagged,
/// and sorted, without serializing to bytes.
pub fn canonical_value(payload: &Value) -> LedgerResult<Value> {
    let pruned = prune_nulls(payload);
    let mut map = match pruned {
        Value::Object(map) => map,
        _ => {
            return Err(LedgerError::CanonicalizationError {
                reason: "payload must be a JSON object at the top level".to_string(),
            })
        }
    };
    map.insert(CANON_VERSION_KEY.to_string(), Value::from(CANON_VERSION));
    Ok(Value::Object(sort_map(map)))
}

/// Recursively drop null values and null-valued object keys. Array elements
/// are never dropped — sequence order and length are semantic.
fn prune_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut pruned = Map::new();
            for (key, val) in map {
                if val.is_null() {
                    continue;
                }
                pruned.insert(key.clone(), prune_nulls(val));
            }
            Value::Object(sort_map(pruned))
        }
        Value::Array(items) => Value::Array(items.iter().map(prune_nulls).collect()),
        other => other.clone(),
    }
}

/// Rebuild `map` with keys inserted in lexicographic UTF-8 byte order.
fn sort_map(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
    let mut sorted = Map::new();
    for (key, val) in entries {
        sorted.insert(key, val);
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_null_valued_keys() {
        let with_null = json!({"a": 1, "b": null});
        let without_null = json!({"a": 1});
        assert_eq!(
            canonicalize(&with_null).unwrap(),
            canonicalize(&without_null).unwrap()
        );
    }

    #[test]
    fn key_order_is_irrelevant() {
        let a = json!({"z": 1, "a": 2});
        let b = json!({"a": 2, "z": 1});
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn array_order_is_semantic() {
        let a = json!({"xs": [1, 2, 3]});
        let b = json!({"xs": [3, 2, 1]});
        assert_ne!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn canon_version_tag_is_present_and_sorted_first() {
        let value = canonical_value(&json!({"statement": "hello"})).unwrap();
        let bytes = serde_json::to_vec(&value).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("{\"__canon_v\":1,"));
    }

    #[test]
    fn idempotent_under_parse_and_reserialize() {
        let payload = json!({"b": {"y": null, "x": 1}, "a": [1, null, 2]});
        let once = canonicalize(&payload).unwrap();
        let reparsed = parse(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn decimal_strings_are_not_parsed_as_numbers() {
        let payload = json!({"price": "19.990"});
        let bytes = canonicalize(&payload).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"19.990\""));
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        let payload = json!([1, 2, 3]);
        assert!(canonicalize(&payload).is_err());
    }
}
