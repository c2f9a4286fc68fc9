// SPDX-License-Identifier: Apache-2.0

//! Federation engine.
//!
//! Owns the source registry, the planner and the statistics, and runs the
//! pipeline: resolve sources → probe → plan → re-fetch → join → bound.
//! Nothing is cached between calls; every plan and execution re-queries
//! the sources.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use pocket_core::{FederationError, FederationResult, QueryExecutor};

use crate::config::FederationConfig;
use crate::registry::{DataSource, SourceRegistry};
use crate::timeout::TimeoutExecutor;

use super::fanout::{elapsed_ms, fan_out, FanoutOptions, FanoutTarget};
use super::join::{apply_global_filter, join_documents};
use super::planner::JoinPlanner;
use super::stats::{FederationStats, StatsCollector};
use super::types::{
    FanoutRequest, FanoutResult, FederatedQuerySpec, FederatedQueryResult, FederatedRow,
    JoinStrategy, QueryPlan,
};

/// Resolved fetch targets of a spec: primary side, then the join side if any.
type SpecTargets = (Vec<FanoutTarget>, Option<FanoutTarget>);

pub struct FederationEngine {
    config: FederationConfig,
    /// Mutated only by register/unregister; never locked across an await.
    registry: RwLock<SourceRegistry>,
    planner: JoinPlanner,
    stats: StatsCollector,
}

impl FederationEngine {
    pub fn new(config: FederationConfig) -> Self {
        let config = config.normalized();
        Self {
            planner: JoinPlanner::new(config.hash_join_threshold),
            stats: StatsCollector::new(config.plan_history_capacity),
            registry: RwLock::new(SourceRegistry::new()),
            config,
        }
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    // ─── Registry ────────────────────────────────────────────────

    /// Registers a source with its executor, wrapped in a timeout when configured.
    #[instrument(skip(self, source, executor), fields(source_id = %source.id))]
    pub fn register(
        &self,
        source: DataSource,
        executor: Arc<dyn QueryExecutor>,
    ) -> FederationResult<()> {
        let executor: Arc<dyn QueryExecutor> = match self.config.source_timeout_ms {
            Some(timeout_ms) => Arc::new(TimeoutExecutor::new(executor, timeout_ms)),
            None => executor,
        };
        let location = source.location;
        self.registry.write().register(source, executor)?;
        info!(?location, "Source registered");
        Ok(())
    }

    /// Removes a source; unknown ids are a no-op. The executor is not closed.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.registry.write().unregister(id);
        if removed {
            info!(source_id = id, "Source unregistered");
        }
        removed
    }

    pub fn resolve_sources_for_collection(&self, collection: &str) -> Vec<DataSource> {
        self.registry
            .read()
            .resolve_sources_for_collection(collection)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn QueryExecutor>> {
        self.registry.read().get(id)
    }

    pub fn source(&self, id: &str) -> Option<DataSource> {
        self.registry.read().source(id).cloned()
    }

    /// Registered sources in registration order.
    pub fn sources(&self) -> Vec<DataSource> {
        self.registry.read().sources().into_iter().cloned().collect()
    }

    pub fn catalog(&self) -> BTreeMap<String, Vec<String>> {
        self.registry.read().catalog()
    }

    /// Asks every source for its live collection list, concurrently.
    /// Display only: routing keeps using the declared collections.
    pub async fn discover_collections(&self) -> BTreeMap<String, FederationResult<Vec<String>>> {
        let executors: Vec<(String, Arc<dyn QueryExecutor>)> = {
            let registry = self.registry.read();
            registry
                .sources()
                .into_iter()
                .filter_map(|source| registry.get(&source.id).map(|e| (source.id.clone(), e)))
                .collect()
        };

        let listings = executors.into_iter().map(|(id, executor)| async move {
            let listed = executor
                .list_collections()
                .await
                .map_err(|e| FederationError::source_execution(&id, &e));
            (id, listed)
        });
        join_all(listings).await.into_iter().collect()
    }

    // ─── Queries ─────────────────────────────────────────────────

    /// Fanout only: one collection across every source exposing it (or the
    /// explicit list), merged in priority order and bounded by the limit.
    #[instrument(skip(self, request), fields(collection = %request.collection))]
    pub async fn query(&self, request: &FanoutRequest) -> FederationResult<FanoutResult> {
        let targets = {
            let registry = self.registry.read();
            match &request.explicit_sources {
                Some(ids) => targets_for_ids(&registry, ids),
                None => registry
                    .resolve_sources_for_collection(&request.collection)
                    .into_iter()
                    .map(|source| FanoutTarget {
                        source_id: source.id.clone(),
                        executor: registry.get(&source.id),
                    })
                    .collect(),
            }
        };

        let result = fan_out(
            &targets,
            &request.collection,
            request.filter.as_ref(),
            request.limit,
            self.fanout_options(),
        )
        .await?;
        debug!(
            sources = result.sources.len(),
            total = result.total_count,
            returned = result.documents.len(),
            "Fanout complete"
        );
        Ok(result)
    }

    /// Probes both sides and chooses a strategy. The primary side is probed
    /// with its filter, the join side without one.
    #[instrument(skip(self, spec), fields(collection = %spec.primary.collection, join = spec.join.is_some()))]
    pub async fn plan(&self, spec: &FederatedQuerySpec) -> FederationResult<QueryPlan> {
        let start = Instant::now();
        let (primary_targets, join_target) = self.resolve_spec(spec)?;
        let (primary, secondary) = self
            .fetch_sides(spec, &primary_targets, join_target.as_ref())
            .await?;

        let join_rows = secondary.map(|side| side.total_count);
        let mut plan = self.planner.build_plan(spec, primary.total_count, join_rows);
        plan.planning_time_ms = elapsed_ms(start);
        self.stats.record_plan(plan.strategy, plan.planning_time_ms);

        info!(
            strategy = %plan.strategy,
            primary_rows = plan.estimated_primary_rows,
            join_rows = plan.estimated_join_rows,
            cost = plan.estimated_total_cost,
            "Plan generated"
        );
        Ok(plan)
    }

    /// Plans then executes.
    pub async fn execute(&self, spec: &FederatedQuerySpec) -> FederationResult<FederatedQueryResult> {
        let plan = self.plan(spec).await?;
        self.execute_plan(spec, &plan).await
    }

    /// Executes a plan previously produced for `spec`, re-fetching both sides.
    #[instrument(skip(self, spec, plan), fields(strategy = %plan.strategy))]
    pub async fn execute_plan(
        &self,
        spec: &FederatedQuerySpec,
        plan: &QueryPlan,
    ) -> FederationResult<FederatedQueryResult> {
        if plan.strategy.is_join() != spec.join.is_some() {
            return Err(FederationError::invalid_query(format!(
                "plan strategy '{}' does not match the query",
                plan.strategy
            )));
        }
        self.run(spec, plan.strategy).await
    }

    /// Joins two sources directly with the given strategy, skipping the
    /// planner (no probes, no plan statistics).
    #[instrument(skip(self, spec), fields(collection = %spec.primary.collection))]
    pub async fn join(
        &self,
        spec: &FederatedQuerySpec,
        strategy: JoinStrategy,
    ) -> FederationResult<FederatedQueryResult> {
        if spec.join.is_none() {
            return Err(FederationError::invalid_query("join requires a join clause"));
        }
        if !strategy.is_join() {
            return Err(FederationError::invalid_query(
                "join requires hash-join or nested-loop",
            ));
        }
        self.run(spec, strategy).await
    }

    pub fn get_stats(&self) -> FederationStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    // ─── Internals ───────────────────────────────────────────────

    fn fanout_options(&self) -> FanoutOptions<'_> {
        FanoutOptions {
            tag_field: &self.config.source_tag_field,
            policy: self.config.fanout_policy(),
        }
    }

    /// Validates the spec and resolves its sources; unregistered ids fail here.
    fn resolve_spec(&self, spec: &FederatedQuerySpec) -> FederationResult<SpecTargets> {
        spec.validate()?;
        let registry = self.registry.read();

        let primary_ids = spec.primary_source_ids();
        if let Some(missing) = primary_ids.iter().find(|id| !registry.contains(id)) {
            return Err(FederationError::source_not_found(missing));
        }
        let primary = targets_for_ids(&registry, &primary_ids);

        let join = match &spec.join {
            Some(join) => {
                let executor = registry
                    .get(&join.source)
                    .ok_or_else(|| FederationError::source_not_found(&join.source))?;
                Some(FanoutTarget {
                    source_id: join.source.clone(),
                    executor: Some(executor),
                })
            }
            None => None,
        };

        Ok((primary, join))
    }

    /// Fetches the primary side (filtered) and the join side (unfiltered) concurrently.
    async fn fetch_sides(
        &self,
        spec: &FederatedQuerySpec,
        primary_targets: &[FanoutTarget],
        join_target: Option<&FanoutTarget>,
    ) -> FederationResult<(FanoutResult, Option<FanoutResult>)> {
        let options = self.fanout_options();

        let primary = fan_out(
            primary_targets,
            &spec.primary.collection,
            spec.primary.filter.as_ref(),
            None,
            options,
        );
        let secondary = async {
            match (join_target, &spec.join) {
                (Some(target), Some(join)) => {
                    fan_out(std::slice::from_ref(target), &join.collection, None, None, options)
                        .await
                        .map(Some)
                }
                _ => Ok(None),
            }
        };

        tokio::try_join!(primary, secondary)
    }

    async fn run(
        &self,
        spec: &FederatedQuerySpec,
        strategy: JoinStrategy,
    ) -> FederationResult<FederatedQueryResult> {
        let start = Instant::now();
        let (primary_targets, join_target) = self.resolve_spec(spec)?;
        let (primary, secondary) = self
            .fetch_sides(spec, &primary_targets, join_target.as_ref())
            .await?;

        let mut sources_queried = primary.sources;
        let mut failed_sources = primary.failed_sources;
        let mut primary_docs = primary.documents;
        apply_global_filter(&mut primary_docs, spec.global_filter.as_ref());

        let (mut rows, joined_count, executed) = match (&spec.join, secondary) {
            (Some(clause), Some(secondary)) => {
                sources_queried.extend(secondary.sources);
                failed_sources.extend(secondary.failed_sources);
                let output = join_documents(strategy, primary_docs, &secondary.documents, clause);
                (output.rows, output.joined_count, strategy)
            }
            _ => (
                primary_docs.into_iter().map(FederatedRow::unjoined).collect(),
                0,
                JoinStrategy::NoJoin,
            ),
        };

        // joined_count covers every match the join produced, before the limit
        if let Some(limit) = spec.limit {
            rows.truncate(limit);
        }

        self.stats.record_execution();
        let total_duration_ms = elapsed_ms(start);
        info!(
            strategy = %executed,
            rows = rows.len(),
            joined = joined_count,
            failed_sources = failed_sources.len(),
            duration_ms = total_duration_ms,
            "Federated query executed"
        );

        Ok(FederatedQueryResult {
            rows,
            strategy: executed,
            sources_queried,
            failed_sources,
            joined_count,
            total_duration_ms,
        })
    }
}

impl Default for FederationEngine {
    fn default() -> Self {
        Self::new(FederationConfig::default())
    }
}

/// Priority-ordered targets for an explicit id list; unknown ids get no executor.
fn targets_for_ids(registry: &SourceRegistry, ids: &[String]) -> Vec<FanoutTarget> {
    registry
        .order_by_priority(ids)
        .into_iter()
        .map(|id| FanoutTarget {
            executor: registry.get(&id),
            source_id: id,
        })
        .collect()
}
