//! Schemaless record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One structured data item: a map from field name to value.
///
/// Field sets vary freely between records. Field order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a JSON value into a record. Returns `None` for non-objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Inserts a top-level field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Returns a top-level field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Resolves a dotted field path (`address.city`).
    ///
    /// Returns `None` if any segment is missing or descends into a
    /// non-record value.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns true if the path resolves to a value (null included)
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Writes `value` at a dotted path, creating intermediate records.
    ///
    /// A non-record value in the way is replaced.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = match segments.pop() {
            Some(last) => last,
            None => return,
        };

        let mut current = &mut self.fields;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.to_string(), value);
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates top-level fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Returns the underlying field map
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("Alice")).is_none());
        assert!(Record::from_value(json!({})).is_some());
    }

    #[test]
    fn test_lookup_nested_path() {
        let r = record(json!({"name": "Alice", "address": {"city": "Delhi"}}));
        assert_eq!(r.lookup("name"), Some(&json!("Alice")));
        assert_eq!(r.lookup("address.city"), Some(&json!("Delhi")));
        assert_eq!(r.lookup("address.zip"), None);
        assert_eq!(r.lookup("name.first"), None);
    }

    #[test]
    fn test_contains_null_field() {
        let r = record(json!({"marks": null}));
        assert!(r.contains("marks"));
        assert!(!r.contains("age"));
    }

    #[test]
    fn test_set_path_builds_nested_records() {
        let mut r = Record::new();
        r.set_path("address.city", json!("Delhi"));
        r.set_path("address.zip", json!("110001"));
        r.set_path("name", json!("Alice"));
        assert_eq!(
            r.into_value(),
            json!({"address": {"city": "Delhi", "zip": "110001"}, "name": "Alice"})
        );
    }

    #[test]
    fn test_set_path_replaces_scalar_in_the_way() {
        let mut r = record(json!({"address": "unknown"}));
        r.set_path("address.city", json!("Delhi"));
        assert_eq!(r.lookup("address.city"), Some(&json!("Delhi")));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let r = Record::new().with("name", json!("Eva")).with("age", json!(20));
        assert_eq!(serde_json::to_value(&r).unwrap(), json!({"name": "Eva", "age": 20}));
    }
}
