// SPDX-License-Identifier: Apache-2.0

//! Fanout / merge executor.
//!
//! Sends one query per source concurrently, waits for all of them, then
//! concatenates the source-tagged blocks in the order the targets were given
//! (source priority). Limits truncate the merged sequence from the front.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use pocket_core::{Document, ExecutorResult, FederationError, FederationResult, Filter, QueryExecutor};

use super::types::{FanoutResult, SourceFailure, SourceQueryStat};

/// What to do when one source of a fanout fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FanoutPolicy {
    /// The first failing source, in priority order, fails the whole fanout.
    ///
    /// Results are collected in priority order, so a failure is only
    /// reported once every higher-priority source has answered; a hung
    /// higher-priority source delays it until its own timeout
    /// (`sourceTimeoutMs`), if one is configured.
    #[default]
    FailFast,
    /// Failing sources contribute nothing and are reported in `failed_sources`.
    TolerateFailures,
}

/// A source selected for a fanout. `executor` is `None` when the id is not
/// registered; such a target contributes an empty block.
#[derive(Clone)]
pub struct FanoutTarget {
    pub source_id: String,
    pub executor: Option<Arc<dyn QueryExecutor>>,
}

#[derive(Debug, Clone, Copy)]
pub struct FanoutOptions<'a> {
    pub tag_field: &'a str,
    pub policy: FanoutPolicy,
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Queries `collection` on every target concurrently and merges the results.
pub async fn fan_out(
    targets: &[FanoutTarget],
    collection: &str,
    filter: Option<&Filter>,
    limit: Option<usize>,
    options: FanoutOptions<'_>,
) -> FederationResult<FanoutResult> {
    if targets.is_empty() {
        debug!(collection, "No source exposes collection");
        return Ok(FanoutResult::default());
    }

    let start = Instant::now();
    let mut handles = Vec::with_capacity(targets.len());

    for target in targets {
        let executor = target.executor.clone();
        let collection = collection.to_string();
        let filter = filter.cloned();

        handles.push(tokio::spawn(async move {
            let started = Instant::now();
            let outcome: ExecutorResult<Vec<Document>> = match executor {
                Some(executor) => executor.query(&collection, filter.as_ref(), None).await,
                None => Ok(Vec::new()),
            };
            (outcome, elapsed_ms(started))
        }));
    }

    let mut result = FanoutResult::default();
    let mut pending = handles.into_iter();

    for target in targets {
        let Some(handle) = pending.next() else { break };

        let (outcome, duration_ms) = match handle.await {
            Ok(done) => done,
            Err(e) => {
                pending.for_each(|h| h.abort());
                return Err(FederationError::internal(format!(
                    "Fetch task for source '{}' failed: {e}",
                    target.source_id
                )));
            }
        };

        match outcome {
            Ok(mut docs) => {
                if target.executor.is_none() {
                    warn!(source_id = %target.source_id, "No executor registered, contributing no rows");
                }
                tag_documents(&mut docs, options.tag_field, &target.source_id);
                debug!(source_id = %target.source_id, count = docs.len(), duration_ms, "Source fetched");
                result.sources.push(SourceQueryStat {
                    source_id: target.source_id.clone(),
                    count: docs.len(),
                    duration_ms,
                });
                result.documents.extend(docs);
            }
            Err(err) => match options.policy {
                FanoutPolicy::FailFast => {
                    pending.for_each(|h| h.abort());
                    return Err(FederationError::source_execution(&target.source_id, &err));
                }
                FanoutPolicy::TolerateFailures => {
                    warn!(source_id = %target.source_id, error = %err, "Source failed, continuing without it");
                    result.failed_sources.push(SourceFailure {
                        source_id: target.source_id.clone(),
                        message: err.to_string(),
                    });
                }
            },
        }
    }

    result.total_count = result.documents.len();
    if let Some(limit) = limit {
        result.documents.truncate(limit);
    }
    result.duration_ms = elapsed_ms(start);
    Ok(result)
}

/// Stamps the origin on each document; only the reserved field is touched.
fn tag_documents(docs: &mut [Document], tag_field: &str, source_id: &str) {
    for doc in docs {
        doc.insert(tag_field, Value::String(source_id.to_string()));
    }
}
