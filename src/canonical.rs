//! Canonical key ordering for hub payloads.

use serde_json::{Map, Value};

/// Rebuild a JSON object so its keys appear in ascending lexicographic order.
///
/// Two structurally-equal payloads serialize to identical bytes after
/// normalization, which is what the change observer compares. Non-object
/// values pass through unchanged; ordering is applied to the top-level keys
/// only (device ids), matching how the hub keys its state responses.
///
/// # Examples
///
/// ```
/// use hue_bridge_rs::normalize;
///
/// let payload: serde_json::Value = serde_json::from_str(r#"{"2":{},"1":{}}"#).unwrap();
/// let sorted = normalize(payload);
/// let keys: Vec<&String> = sorted.as_object().unwrap().keys().collect();
/// assert_eq!(keys, ["1", "2"]);
/// ```
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();

            let mut sorted = Map::with_capacity(keys.len());
            for key in keys {
                if let Some(entry) = map.remove(&key) {
                    sorted.insert(key, entry);
                }
            }
            Value::Object(sorted)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<String> {
        value
            .as_object()
            .expect("object")
            .keys()
            .cloned()
            .collect()
    }

    #[test]
    fn test_sorts_keys_lexicographically() {
        // preserve_order keeps insertion order, so the input really is c, a, b
        let input: Value = serde_json::from_str(r#"{"c":3,"a":1,"b":2}"#).unwrap();
        assert_eq!(keys(&input), ["c", "a", "b"]);

        let sorted = normalize(input);
        assert_eq!(keys(&sorted), ["a", "b", "c"]);
        assert_eq!(sorted, json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(normalize(json!({})), json!({}));
    }

    #[test]
    fn test_idempotent() {
        let input: Value = serde_json::from_str(r#"{"10":true,"2":false,"1":null}"#).unwrap();
        let once = normalize(input);
        let twice = normalize(once.clone());
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn test_preserves_values() {
        let input: Value = serde_json::from_str(r#"{"b":{"z":1,"a":2},"a":[3,2,1]}"#).unwrap();
        let sorted = normalize(input);
        assert_eq!(sorted["a"], json!([3, 2, 1]));
        // nested objects are left as received
        assert_eq!(keys(&sorted["b"]), ["z", "a"]);
    }

    #[test]
    fn test_non_object_passthrough() {
        assert_eq!(normalize(json!("Linking")), json!("Linking"));
        assert_eq!(normalize(json!([1, 2])), json!([1, 2]));
        assert_eq!(normalize(Value::Null), Value::Null);
    }
}
