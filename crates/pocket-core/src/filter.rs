// SPDX-License-Identifier: Apache-2.0

//! Document filters.
//!
//! A filter is itself a document mapping field paths to conditions. A plain
//! value means equality (sub-documents compare structurally); an object whose
//! keys all start with `$` is a set of operators applied to that field. All
//! entries must hold. `$and` / `$or` take arrays of nested filters.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Adds a condition and returns the filter, for chained construction.
    pub fn with(mut self, field: impl Into<String>, condition: impl Into<Value>) -> Self {
        self.0.insert(field.into(), condition.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Full evaluation: equality, operators and logical groups.
    pub fn matches(&self, doc: &Document) -> bool {
        matches_map(&self.0, doc)
    }

    /// Exact field-value equality for every entry; operators are not
    /// interpreted, so `{"age": {"$gt": 1}}` only matches a literal
    /// `{"$gt": 1}` value.
    pub fn matches_exact(&self, doc: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| doc.get_path(field) == Some(expected))
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Filter {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

fn matches_map(conditions: &Map<String, Value>, doc: &Document) -> bool {
    conditions.iter().all(|(key, condition)| match key.as_str() {
        "$and" => nested_filters(condition).is_some_and(|mut group| group.all(|f| matches_map(f, doc))),
        "$or" => nested_filters(condition).is_some_and(|mut group| group.any(|f| matches_map(f, doc))),
        field => condition_matches(doc.get_path(field), condition),
    })
}

/// Yields the nested filters of a logical group; `None` if the group is malformed.
fn nested_filters(condition: &Value) -> Option<impl Iterator<Item = &Map<String, Value>>> {
    let items = condition.as_array()?;
    if !items.iter().all(Value::is_object) {
        return None;
    }
    Some(items.iter().filter_map(Value::as_object))
}

fn condition_matches(field_value: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if is_operator_object(ops) => ops
            .iter()
            .all(|(op, operand)| evaluate_operator(field_value, op, operand)),
        _ => field_value == Some(condition),
    }
}

fn is_operator_object(ops: &Map<String, Value>) -> bool {
    !ops.is_empty() && ops.keys().all(|k| k.starts_with('$'))
}

fn evaluate_operator(field_value: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$eq" => field_value == Some(operand),
        "$ne" => field_value != Some(operand),
        "$gt" => compare_values(field_value, operand) == Some(Ordering::Greater),
        "$gte" => matches!(
            compare_values(field_value, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "$lt" => compare_values(field_value, operand) == Some(Ordering::Less),
        "$lte" => matches!(
            compare_values(field_value, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        "$in" => match (field_value, operand) {
            (Some(value), Value::Array(candidates)) => candidates.contains(value),
            _ => false,
        },
        "$nin" => match (field_value, operand) {
            (Some(value), Value::Array(candidates)) => !candidates.contains(value),
            _ => true,
        },
        "$contains" => string_test(field_value, operand, |s, t| s.contains(t)),
        "$startsWith" => string_test(field_value, operand, |s, t| s.starts_with(t)),
        "$endsWith" => string_test(field_value, operand, |s, t| s.ends_with(t)),
        "$exists" => field_value.is_some() == operand.as_bool().unwrap_or(true),
        _ => false,
    }
}

fn string_test(field_value: Option<&Value>, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (field_value, operand) {
        (Some(Value::String(value)), Value::String(target)) => test(value, target),
        _ => false,
    }
}

/// Numbers compare numerically, strings lexicographically; anything else is unordered.
fn compare_values(a: Option<&Value>, b: &Value) -> Option<Ordering> {
    match (a?, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).expect("object")
    }

    fn filter(value: Value) -> Filter {
        Filter::try_from(value).expect("object")
    }

    #[test]
    fn plain_values_mean_equality() {
        let d = doc(json!({"name": "Alice", "active": true, "tags": ["a"]}));
        assert!(filter(json!({"name": "Alice", "active": true})).matches(&d));
        assert!(filter(json!({"tags": ["a"]})).matches(&d));
        assert!(!filter(json!({"name": "Bob"})).matches(&d));
        assert!(!filter(json!({"missing": null})).matches(&d));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc(json!({"x": 1}))));
        assert!(Filter::new().matches_exact(&Document::new()));
    }

    #[test]
    fn comparison_operators() {
        let d = doc(json!({"age": 30, "name": "Charlie"}));
        assert!(filter(json!({"age": {"$gt": 25}})).matches(&d));
        assert!(filter(json!({"age": {"$gte": 30, "$lt": 31}})).matches(&d));
        assert!(!filter(json!({"age": {"$lte": 29}})).matches(&d));
        assert!(filter(json!({"name": {"$gt": "Bob"}})).matches(&d));
        // mixed types never order
        assert!(!filter(json!({"age": {"$gt": "10"}})).matches(&d));
    }

    #[test]
    fn membership_and_string_operators() {
        let d = doc(json!({"role": "admin", "name": "Charlie"}));
        assert!(filter(json!({"role": {"$in": ["admin", "owner"]}})).matches(&d));
        assert!(!filter(json!({"role": {"$nin": ["admin"]}})).matches(&d));
        assert!(filter(json!({"missing": {"$nin": ["x"]}})).matches(&d));
        assert!(filter(json!({"name": {"$contains": "harl"}})).matches(&d));
        assert!(filter(json!({"name": {"$startsWith": "Ch", "$endsWith": "ie"}})).matches(&d));
    }

    #[test]
    fn exists_operator() {
        let d = doc(json!({"email": null}));
        assert!(filter(json!({"email": {"$exists": true}})).matches(&d));
        assert!(filter(json!({"phone": {"$exists": false}})).matches(&d));
    }

    #[test]
    fn logical_groups() {
        let d = doc(json!({"age": 30, "role": "admin"}));
        assert!(filter(json!({"$and": [{"age": {"$gte": 25}}, {"role": "admin"}]})).matches(&d));
        assert!(filter(json!({"$or": [{"role": "owner"}, {"age": 30}]})).matches(&d));
        assert!(!filter(json!({"$or": [{"role": "owner"}, {"age": 31}]})).matches(&d));
        assert!(!filter(json!({"$and": "nope"})).matches(&d));
    }

    #[test]
    fn nested_paths_and_sub_documents() {
        let d = doc(json!({"profile": {"city": "Paris", "geo": {"lat": 1}}}));
        assert!(filter(json!({"profile.city": "Paris"})).matches(&d));
        assert!(filter(json!({"profile.geo": {"lat": 1}})).matches(&d));
    }

    #[test]
    fn exact_matching_ignores_operators() {
        let d = doc(json!({"age": 30}));
        assert!(filter(json!({"age": 30})).matches_exact(&d));
        assert!(!filter(json!({"age": {"$gt": 1}})).matches_exact(&d));
    }
}
