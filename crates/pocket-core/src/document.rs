// SPDX-License-Identifier: Apache-2.0

//! Opaque document records.
//!
//! Sources hand back documents as bags of JSON fields. The engine never
//! inspects them structurally except through explicit field lookups
//! (join keys, global filters, the source tag).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless document: an ordered-by-key map of field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Resolves a dotted path (`"profile.address.city"`) through nested objects.
    ///
    /// A key that literally contains dots wins over path traversal.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

/// Only JSON objects are documents; anything else is handed back unchanged.
impl TryFrom<Value> for Document {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).expect("object")
    }

    #[test]
    fn get_path_walks_nested_objects() {
        let d = doc(json!({"a": {"b": {"c": 42}}, "x": 1}));
        assert_eq!(d.get_path("a.b.c"), Some(&json!(42)));
        assert_eq!(d.get_path("x"), Some(&json!(1)));
        assert_eq!(d.get_path("a.missing"), None);
        assert_eq!(d.get_path("x.y"), None);
    }

    #[test]
    fn literal_dotted_key_takes_precedence() {
        let d = doc(json!({"a.b": "literal", "a": {"b": "nested"}}));
        assert_eq!(d.get_path("a.b"), Some(&json!("literal")));
    }

    #[test]
    fn non_objects_are_rejected() {
        assert_eq!(Document::try_from(json!([1, 2])), Err(json!([1, 2])));
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut d = Document::new();
        d.insert("_id", "u1");
        assert_eq!(serde_json::to_value(&d).unwrap(), json!({"_id": "u1"}));
    }
}
