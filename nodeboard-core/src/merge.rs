//! Structural merge helpers shared by the configuration store and the node
//! update protocol.
//!
//! Two values merge recursively only when both are JSON objects. Any other
//! pairing, arrays included, means the source value replaces the target
//! value wholesale. A [`Value`] owns its whole tree, so `clone()` is the
//! deep copy used for snapshots.

use serde_json::{Map, Value};

/// Deep-merge `source` into `target` in place.
///
/// Keys absent from `source` are left untouched at every depth.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => merge_maps(target, source),
        (target, source) => *target = source.clone(),
    }
}

/// Deep-merge the entries of `source` into `target`.
pub fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match target.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                deep_merge(existing, value);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Build a fresh object by merging each source over `base`, in order.
///
/// A non-object `base` starts from an empty object and non-object sources
/// are skipped, so the result is always an object.
#[must_use]
pub fn deep_merged(base: &Value, sources: &[&Value]) -> Value {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    for source in sources {
        if let Value::Object(source) = source {
            merge_maps(&mut merged, source);
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_into_itself_is_unchanged() {
        let original = json!({"a": {"b": 1, "c": [1, 2]}, "d": "x"});
        let mut merged = original.clone();
        deep_merge(&mut merged, &original);
        assert_eq!(merged, original);
    }

    #[test]
    fn test_merge_preserves_siblings() {
        let mut target = json!({"a": {"b": 1}});
        deep_merge(&mut target, &json!({"a": {"c": 2}}));
        assert_eq!(target, json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let mut target = json!({"list": [1, 2, 3]});
        deep_merge(&mut target, &json!({"list": [9]}));
        assert_eq!(target, json!({"list": [9]}));
    }

    #[test]
    fn test_scalar_and_null_replace_objects() {
        let mut target = json!({"a": {"b": 1}, "c": {"d": 2}});
        deep_merge(&mut target, &json!({"a": 5, "c": null}));
        assert_eq!(target, json!({"a": 5, "c": null}));

        let mut target = json!({"a": 5});
        deep_merge(&mut target, &json!({"a": {"b": 1}}));
        assert_eq!(target, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_deep_merged_skips_non_objects() {
        let base = json!({"width": 800, "snapline": {"enable": true}});
        let merged = deep_merged(&base, &[&json!(7), &json!({"snapline": {"tolerance": 3}})]);
        assert_eq!(
            merged,
            json!({"width": 800, "snapline": {"enable": true, "tolerance": 3}})
        );
        // base stays intact
        assert_eq!(base["snapline"], json!({"enable": true}));

        assert_eq!(deep_merged(&json!([1]), &[]), json!({}));
    }
}
