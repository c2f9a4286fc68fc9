// SPDX-License-Identifier: Apache-2.0

//! In-memory source
//!
//! A local `QueryExecutor` holding named collections in insertion order.
//! Used for embedded local stores and as a test double.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::document::Document;
use crate::error::ExecutorResult;
use crate::filter::Filter;
use crate::traits::QueryExecutor;

#[derive(Debug, Default)]
pub struct MemorySource {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert_many`.
    pub fn with_collection(self, name: impl Into<String>, docs: impl IntoIterator<Item = Document>) -> Self {
        self.insert_many(name, docs);
        self
    }

    pub fn insert(&self, collection: impl Into<String>, doc: Document) {
        self.collections
            .write()
            .entry(collection.into())
            .or_default()
            .push(doc);
    }

    pub fn insert_many(&self, collection: impl Into<String>, docs: impl IntoIterator<Item = Document>) {
        self.collections
            .write()
            .entry(collection.into())
            .or_default()
            .extend(docs);
    }

    /// Drops every document of a collection; the collection itself disappears.
    pub fn clear(&self, collection: &str) {
        self.collections.write().remove(collection);
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl QueryExecutor for MemorySource {
    async fn query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: Option<usize>,
    ) -> ExecutorResult<Vec<Document>> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let matching = docs
            .iter()
            .filter(|doc| filter.map_or(true, |f| f.matches(doc)))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn list_collections(&self) -> ExecutorResult<Vec<String>> {
        Ok(self.collections.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::try_from(value).expect("object")
    }

    fn users() -> MemorySource {
        MemorySource::new().with_collection(
            "users",
            vec![
                doc(json!({"_id": "u1", "active": true})),
                doc(json!({"_id": "u2", "active": false})),
                doc(json!({"_id": "u3", "active": true})),
            ],
        )
    }

    #[tokio::test]
    async fn query_filters_then_limits_in_insertion_order() {
        let source = users();
        let active = Filter::new().with("active", true);

        let all = source.query("users", Some(&active), None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].get("_id"), Some(&json!("u1")));
        assert_eq!(all[1].get("_id"), Some(&json!("u3")));

        let first = source.query("users", Some(&active), Some(1)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].get("_id"), Some(&json!("u1")));
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let source = users();
        assert!(source.query("orders", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_collections_sorted() {
        let source = users().with_collection("accounts", vec![doc(json!({"n": 1}))]);
        assert_eq!(
            source.list_collections().await.unwrap(),
            vec!["accounts".to_string(), "users".to_string()]
        );

        source.clear("accounts");
        assert_eq!(source.count("accounts"), 0);
        assert_eq!(source.count("users"), 3);
    }
}
