// SPDX-License-Identifier: Apache-2.0

//! Types for the federated query engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use pocket_core::{Document, FederationError, FederationResult, Filter};

/// The primary side of a federated query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryClause {
    pub source: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

/// How unmatched rows are treated by a join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Full,
}

/// The secondary side of a two-source join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClause {
    pub source: String,
    pub collection: String,
    /// Key read from primary rows.
    pub on_field: String,
    /// Key read from secondary rows; `on_field` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(rename = "type", default)]
    pub join_type: JoinType,
}

impl JoinClause {
    pub fn new(
        source: impl Into<String>,
        collection: impl Into<String>,
        on_field: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            collection: collection.into(),
            on_field: on_field.into(),
            foreign_key: None,
            join_type: JoinType::Inner,
        }
    }

    pub fn with_foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = Some(field.into());
        self
    }

    pub fn with_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn foreign_key(&self) -> &str {
        self.foreign_key.as_deref().unwrap_or(&self.on_field)
    }
}

/// A caller's federated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedQuerySpec {
    pub primary: PrimaryClause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinClause>,
    /// Exact-match filter applied to primary rows after fetch, before the join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_filter: Option<Filter>,
    /// Bound on the final merged/joined rows, never per source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Fan the primary collection out across exactly these sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_sources: Option<Vec<String>>,
}

impl FederatedQuerySpec {
    pub fn new(source: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            primary: PrimaryClause {
                source: source.into(),
                collection: collection.into(),
                filter: None,
            },
            join: None,
            global_filter: None,
            limit: None,
            explicit_sources: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.primary.filter = Some(filter);
        self
    }

    pub fn with_join(mut self, join: JoinClause) -> Self {
        self.join = Some(join);
        self
    }

    pub fn with_global_filter(mut self, filter: Filter) -> Self {
        self.global_filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_explicit_sources<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit_sources = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Source ids feeding the primary side.
    pub fn primary_source_ids(&self) -> Vec<String> {
        match &self.explicit_sources {
            Some(ids) => ids.clone(),
            None => vec![self.primary.source.clone()],
        }
    }

    pub fn validate(&self) -> FederationResult<()> {
        if self.primary.collection.is_empty() {
            return Err(FederationError::invalid_query("primary collection is empty"));
        }
        if matches!(&self.explicit_sources, Some(ids) if ids.is_empty()) {
            return Err(FederationError::invalid_query("explicit source list is empty"));
        }

        let Some(join) = &self.join else {
            return Ok(());
        };
        if join.collection.is_empty() {
            return Err(FederationError::invalid_query("join collection is empty"));
        }
        if join.on_field.is_empty() || join.foreign_key().is_empty() {
            return Err(FederationError::invalid_query("join key fields must not be empty"));
        }
        if join.collection == self.primary.collection {
            return Err(FederationError::invalid_query(format!(
                "join collection '{}' must differ from the primary collection",
                join.collection
            )));
        }
        Ok(())
    }
}

/// Join strategy chosen by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinStrategy {
    NoJoin,
    HashJoin,
    NestedLoop,
}

impl JoinStrategy {
    pub fn is_join(self) -> bool {
        !matches!(self, Self::NoJoin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoJoin => "no-join",
            Self::HashJoin => "hash-join",
            Self::NestedLoop => "nested-loop",
        }
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanOperation {
    Scan,
    Filter,
    BuildIndex,
    HashJoin,
    NestedLoop,
    Limit,
}

impl PlanOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Filter => "filter",
            Self::BuildIndex => "build-index",
            Self::HashJoin => "hash-join",
            Self::NestedLoop => "nested-loop",
            Self::Limit => "limit",
        }
    }
}

/// One line of the explain trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub operation: PlanOperation,
    pub target: String,
    pub estimated_rows: usize,
    pub description: String,
}

/// Output of planning. Produced for every query, joined or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    pub strategy: JoinStrategy,
    pub estimated_primary_rows: usize,
    pub estimated_join_rows: usize,
    /// Row-operations, not time.
    pub estimated_total_cost: u64,
    pub steps: Vec<PlanStep>,
    pub planning_time_ms: f64,
}

impl QueryPlan {
    /// Human-readable trace, one numbered step per line plus a summary.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} {} (~{} rows): {}\n",
                i + 1,
                step.operation.as_str(),
                step.target,
                step.estimated_rows,
                step.description
            ));
        }
        out.push_str(&format!(
            "strategy={} cost={} (primary={}, join={})",
            self.strategy, self.estimated_total_cost, self.estimated_primary_rows, self.estimated_join_rows
        ));
        out
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.explain())
    }
}

/// Per-source accounting of one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQueryStat {
    pub source_id: String,
    pub count: usize,
    pub duration_ms: f64,
}

/// A source that failed while partial failures were tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source_id: String,
    pub message: String,
}

/// Fanout-only request: one collection across every source exposing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutRequest {
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Overrides discovery when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_sources: Option<Vec<String>>,
}

impl FanoutRequest {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_explicit_sources<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit_sources = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}

/// Merged, source-tagged documents of a fanout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutResult {
    pub documents: Vec<Document>,
    /// Rows across all sources before the limit was applied.
    pub total_count: usize,
    /// In source-priority order.
    pub sources: Vec<SourceQueryStat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sources: Vec<SourceFailure>,
    pub duration_ms: f64,
}

/// One output row. `None` marks a missing side: an unmatched primary row has
/// no `matched`, a right-only row of a full join has no `primary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedRow {
    pub primary: Option<Document>,
    pub matched: Option<Document>,
}

impl FederatedRow {
    pub fn unjoined(doc: Document) -> Self {
        Self {
            primary: Some(doc),
            matched: None,
        }
    }

    /// Flattens into `{...primary, <joined_field>: matched | null}`.
    pub fn to_document(&self, joined_field: &str) -> Document {
        let mut doc = self.primary.clone().unwrap_or_default();
        let matched = self
            .matched
            .clone()
            .map_or(serde_json::Value::Null, Document::into_value);
        doc.insert(joined_field, matched);
        doc
    }
}

/// Output of executing a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedQueryResult {
    pub rows: Vec<FederatedRow>,
    pub strategy: JoinStrategy,
    pub sources_queried: Vec<SourceQueryStat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sources: Vec<SourceFailure>,
    /// Matches produced by the join, counted before the limit.
    pub joined_count: usize,
    pub total_duration_ms: f64,
}
