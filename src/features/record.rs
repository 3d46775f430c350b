//! Flat feature records and the structural diff of metric maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One output row: dotted keys such as `code.old.cyc_comp` mapped to leaf
/// values, in key order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(BTreeMap<String, Value>);

impl FeatureRecord {
    /// Flatten nested objects, joining keys with `.`
    pub fn from_nested(nested: Map<String, Value>) -> Self {
        let mut flat = BTreeMap::new();
        flatten_into(&mut flat, None, nested);
        Self(flat)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn comment_id(&self) -> Option<&str> {
        self.get("meta.comment_id").and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn flatten_into(flat: &mut BTreeMap<String, Value>, prefix: Option<&str>, nested: Map<String, Value>) {
    for (key, value) in nested {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        match value {
            Value::Object(inner) => flatten_into(flat, Some(&path), inner),
            leaf => {
                flat.insert(path, leaf);
            }
        }
    }
}

/// `new - old` for every numeric leaf present on both sides.
///
/// Objects are compared recursively; keys found on one side only and
/// non-numeric values are dropped. Two integers give an integer, any other
/// pair of numbers a float.
pub fn diff_features(old: &Map<String, Value>, new: &Map<String, Value>) -> Map<String, Value> {
    old.iter()
        .filter_map(|(key, old_value)| {
            let new_value = new.get(key)?;
            diff_value(old_value, new_value).map(|diff| (key.clone(), diff))
        })
        .collect()
}

fn diff_value(old: &Value, new: &Value) -> Option<Value> {
    match (old, new) {
        (Value::Number(old), Value::Number(new)) => match (old.as_i64(), new.as_i64()) {
            (Some(old), Some(new)) => Some(Value::from(new - old)),
            _ => Some(Value::from(new.as_f64()? - old.as_f64()?)),
        },
        (Value::Object(old), Value::Object(new)) => Some(Value::Object(diff_features(old, new))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_diff_features() {
        let old = object(json!({"a": 3, "b": {"c": 4, "d": 5}}));
        let new = object(json!({"a": 5, "b": {"c": 0}}));
        assert_eq!(
            Value::Object(diff_features(&old, &new)),
            json!({"a": 2, "b": {"c": -4}})
        );
    }

    #[test]
    fn test_diff_features_floats_and_text() {
        let old = object(json!({"volume": 0.5, "lines": 10, "text": "a", "only_old": 1}));
        let new = object(json!({"volume": 0.75, "lines": 2.5, "text": "b", "only_new": 1}));
        assert_eq!(
            Value::Object(diff_features(&old, &new)),
            json!({"volume": 0.25, "lines": -7.5})
        );
    }

    #[test]
    fn test_flatten() {
        let record = FeatureRecord::from_nested(object(json!({
            "meta": {"comment_id": "abc", "start_line": null},
            "code": {"old": {"nodes": {"all": 3}}},
            "empty": {}
        })));
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["code.old.nodes.all", "meta.comment_id", "meta.start_line"]);
        assert_eq!(record.comment_id(), Some("abc"));
        assert_eq!(record.get("meta.start_line"), Some(&Value::Null));
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = FeatureRecord::from_nested(object(json!({"comment": {"len": 13}})));
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"comment.len":13}"#);
    }
}
