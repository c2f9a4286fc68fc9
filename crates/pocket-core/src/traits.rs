//! QueryExecutor trait definition
//!
//! This is the only contract a data source has to fulfil to take part in
//! federation. Local stores, remote clients and test doubles all implement it.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::ExecutorResult;
use crate::filter::Filter;

/// Query capability supplied with every registered data source
///
/// Implementations only read. Connection lifecycle, retries and transport
/// belong to the implementation, never to the federation engine.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Returns the documents of `collection` matching `filter`, at most `limit` of them
    ///
    /// Filters carry at least exact-match semantics; richer operators are
    /// the source's own business.
    async fn query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: Option<usize>,
    ) -> ExecutorResult<Vec<Document>>;

    /// Lists the collections this source currently holds (discovery display only)
    async fn list_collections(&self) -> ExecutorResult<Vec<String>>;
}
