// SPDX-License-Identifier: Apache-2.0

//! Per-source timeout decorator.
//!
//! The engine itself has no cancellation contract; bounding slow sources is
//! done by wrapping their executor.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{timeout, Duration};

use pocket_core::{Document, ExecutorError, ExecutorResult, Filter, QueryExecutor};

pub struct TimeoutExecutor {
    inner: Arc<dyn QueryExecutor>,
    timeout_ms: u64,
}

impl TimeoutExecutor {
    pub fn new(inner: Arc<dyn QueryExecutor>, timeout_ms: u64) -> Self {
        Self { inner, timeout_ms }
    }

    fn limit(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[async_trait]
impl QueryExecutor for TimeoutExecutor {
    async fn query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: Option<usize>,
    ) -> ExecutorResult<Vec<Document>> {
        timeout(self.limit(), self.inner.query(collection, filter, limit))
            .await
            .map_err(|_| ExecutorError::Timeout {
                timeout_ms: self.timeout_ms,
            })?
    }

    async fn list_collections(&self) -> ExecutorResult<Vec<String>> {
        timeout(self.limit(), self.inner.list_collections())
            .await
            .map_err(|_| ExecutorError::Timeout {
                timeout_ms: self.timeout_ms,
            })?
    }
}
