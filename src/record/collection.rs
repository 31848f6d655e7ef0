//! Record store: an ordered collection of records

use serde_json::Value;
use thiserror::Error;

use super::record::Record;

/// Errors raised while loading a collection from JSON
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Input was not a JSON array
    #[error("collection input must be a JSON array of objects")]
    NotAnArray,

    /// An element of the input array was not an object
    #[error("element {0} of the collection is not an object")]
    NotAnObject(usize),
}

/// An ordered sequence of records.
///
/// Order is insertion order. Records are never mutated in place; stages
/// work on their own copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    name: String,
    records: Vec<Record>,
}

impl Collection {
    /// Creates an empty collection
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }

    /// Creates a collection holding the given records
    pub fn with_records(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// Loads a collection from a JSON array of objects
    pub fn from_json(name: impl Into<String>, value: Value) -> Result<Self, CollectionError> {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(CollectionError::NotAnArray),
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Record::from_value(item).ok_or(CollectionError::NotAnObject(i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_records(name, records))
    }

    /// Appends one record
    pub fn insert(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Appends records in order
    pub fn insert_many(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_preserves_order() {
        let mut students = Collection::new("students");
        students.insert(Record::new().with("name", json!("Alice")));
        students.insert_many(vec![
            Record::new().with("name", json!("Bob")),
            Record::new().with("name", json!("Charlie")),
        ]);

        let names: Vec<_> = students.iter().map(|r| r.get("name").unwrap().clone()).collect();
        assert_eq!(names, vec![json!("Alice"), json!("Bob"), json!("Charlie")]);
        assert_eq!(students.len(), 3);
        assert_eq!(students.name(), "students");
    }

    #[test]
    fn test_from_json_array() {
        let students = Collection::from_json(
            "students",
            json!([{"name": "Alice"}, {"name": "Bob", "age": 22}]),
        )
        .unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students.records()[1].get("age"), Some(&json!(22)));
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert_eq!(
            Collection::from_json("x", json!({"name": "Alice"})),
            Err(CollectionError::NotAnArray)
        );
        assert_eq!(
            Collection::from_json("x", json!([{"a": 1}, 2])),
            Err(CollectionError::NotAnObject(1))
        );
    }
}
