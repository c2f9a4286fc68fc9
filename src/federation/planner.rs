// SPDX-License-Identifier: Apache-2.0

//! Join planner.
//!
//! Turns probed row counts into a strategy, a cost and an explain trace.
//! Probing itself (real queries against the sources) is done by the engine;
//! given the same counts the planner always produces the same plan.

use super::types::{
    FederatedQuerySpec, JoinStrategy, PlanOperation, PlanStep, QueryPlan,
};

/// Selectivity assumed for the global filter in the explain trace only.
const GLOBAL_FILTER_SELECTIVITY: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct JoinPlanner {
    /// Strictly above this on either side, hash-join wins.
    threshold: usize,
}

impl JoinPlanner {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Hash-join once either side exceeds the threshold, nested-loop otherwise.
    /// Returns the strategy with its cost in row-operations.
    pub fn choose_strategy(&self, primary_rows: usize, join_rows: usize) -> (JoinStrategy, u64) {
        let (p, j) = (primary_rows as u64, join_rows as u64);
        if primary_rows > self.threshold || join_rows > self.threshold {
            (JoinStrategy::HashJoin, p.saturating_add(j))
        } else {
            (JoinStrategy::NestedLoop, p.saturating_mul(j))
        }
    }

    /// Builds the plan for `spec` from the probed counts. `join_rows` is
    /// `None` exactly when the spec has no join clause.
    pub fn build_plan(
        &self,
        spec: &FederatedQuerySpec,
        primary_rows: usize,
        join_rows: Option<usize>,
    ) -> QueryPlan {
        let primary_target = format!(
            "{}.{}",
            spec.primary_source_ids().join("+"),
            spec.primary.collection
        );
        let mut steps = vec![PlanStep {
            operation: PlanOperation::Scan,
            target: primary_target,
            estimated_rows: primary_rows,
            description: match &spec.primary.filter {
                Some(_) => format!("Scan {} with source-side filter", spec.primary.collection),
                None => format!("Full scan of {}", spec.primary.collection),
            },
        }];

        let mut estimate = primary_rows;
        if spec.global_filter.is_some() {
            estimate = (primary_rows as f64 * GLOBAL_FILTER_SELECTIVITY) as usize;
            steps.push(PlanStep {
                operation: PlanOperation::Filter,
                target: "global".to_string(),
                estimated_rows: estimate,
                description: "Apply global filter (assumed 50% selectivity)".to_string(),
            });
        }

        let (strategy, cost, join_estimate) = match (&spec.join, join_rows) {
            (Some(join), Some(join_rows)) => {
                let (strategy, cost) = self.choose_strategy(primary_rows, join_rows);
                let join_target = format!("{}.{}", join.source, join.collection);

                if strategy == JoinStrategy::HashJoin {
                    steps.push(PlanStep {
                        operation: PlanOperation::BuildIndex,
                        target: join_target.clone(),
                        estimated_rows: join_rows,
                        description: format!("Build hash index on {}", join.foreign_key()),
                    });
                    steps.push(PlanStep {
                        operation: PlanOperation::HashJoin,
                        target: join_target,
                        estimated_rows: estimate,
                        description: format!(
                            "Probe index with {} ({:?} join, {} > {} rows on a side)",
                            join.on_field,
                            join.join_type,
                            primary_rows.max(join_rows),
                            self.threshold
                        ),
                    });
                } else {
                    steps.push(PlanStep {
                        operation: PlanOperation::NestedLoop,
                        target: join_target,
                        estimated_rows: estimate,
                        description: format!(
                            "Scan {} rows per primary row matching {} = {} ({:?} join)",
                            join_rows,
                            join.on_field,
                            join.foreign_key(),
                            join.join_type
                        ),
                    });
                }
                (strategy, cost, join_rows)
            }
            _ => (JoinStrategy::NoJoin, primary_rows as u64, 0),
        };

        if let Some(limit) = spec.limit {
            steps.push(PlanStep {
                operation: PlanOperation::Limit,
                target: "result".to_string(),
                estimated_rows: estimate.min(limit),
                description: format!("Return at most {limit} rows"),
            });
        }

        QueryPlan {
            strategy,
            estimated_primary_rows: primary_rows,
            estimated_join_rows: join_estimate,
            estimated_total_cost: cost,
            steps,
            planning_time_ms: 0.0,
        }
    }
}

impl Default for JoinPlanner {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HASH_JOIN_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::types::{JoinClause, JoinType};
    use pocket_core::Filter;

    fn join_spec() -> FederatedQuerySpec {
        FederatedQuerySpec::new("users-db", "users").with_join(
            JoinClause::new("orders-db", "orders", "_id")
                .with_foreign_key("userId")
                .with_type(JoinType::Left),
        )
    }

    fn operations(plan: &QueryPlan) -> Vec<PlanOperation> {
        plan.steps.iter().map(|s| s.operation).collect()
    }

    #[test]
    fn threshold_is_strict() {
        let planner = JoinPlanner::default();
        assert_eq!(planner.choose_strategy(100, 100), (JoinStrategy::NestedLoop, 10_000));
        assert_eq!(planner.choose_strategy(101, 3), (JoinStrategy::HashJoin, 104));
        assert_eq!(planner.choose_strategy(2, 150), (JoinStrategy::HashJoin, 152));
        assert_eq!(planner.choose_strategy(0, 0), (JoinStrategy::NestedLoop, 0));
    }

    #[test]
    fn no_join_costs_the_primary_scan() {
        let spec = FederatedQuerySpec::new("users-db", "users");
        let plan = JoinPlanner::default().build_plan(&spec, 42, None);

        assert_eq!(plan.strategy, JoinStrategy::NoJoin);
        assert_eq!(plan.estimated_total_cost, 42);
        assert_eq!(plan.estimated_join_rows, 0);
        assert_eq!(operations(&plan), vec![PlanOperation::Scan]);
        assert_eq!(plan.steps[0].target, "users-db.users");
    }

    #[test]
    fn small_join_plans_nested_loop() {
        let plan = JoinPlanner::default().build_plan(&join_spec(), 2, Some(3));

        assert_eq!(plan.strategy, JoinStrategy::NestedLoop);
        assert_eq!(plan.estimated_total_cost, 6);
        assert_eq!(operations(&plan), vec![PlanOperation::Scan, PlanOperation::NestedLoop]);
    }

    #[test]
    fn large_join_plans_hash_join_with_index_step() {
        let spec = join_spec()
            .with_global_filter(Filter::new().with("active", true))
            .with_limit(10);
        let plan = JoinPlanner::default().build_plan(&spec, 2, Some(150));

        assert_eq!(plan.strategy, JoinStrategy::HashJoin);
        assert_eq!(plan.estimated_total_cost, 152);
        assert_eq!(
            operations(&plan),
            vec![
                PlanOperation::Scan,
                PlanOperation::Filter,
                PlanOperation::BuildIndex,
                PlanOperation::HashJoin,
                PlanOperation::Limit,
            ]
        );
        assert_eq!(plan.steps[1].estimated_rows, 1);
        assert_eq!(plan.steps[2].target, "orders-db.orders");
        assert_eq!(plan.steps[4].estimated_rows, 1);
    }

    #[test]
    fn global_filter_does_not_change_strategy() {
        let planner = JoinPlanner::new(10);
        let with_filter = join_spec().with_global_filter(Filter::new().with("x", 1));
        // 16 halves to 8 in the trace, yet the raw count still decides
        let plan = planner.build_plan(&with_filter, 16, Some(1));
        assert_eq!(plan.strategy, JoinStrategy::HashJoin);
    }

    #[test]
    fn explicit_sources_show_in_scan_target() {
        let spec = FederatedQuerySpec::new("a", "users").with_explicit_sources(["a", "b"]);
        let plan = JoinPlanner::default().build_plan(&spec, 5, None);
        assert_eq!(plan.steps[0].target, "a+b.users");
    }

    #[test]
    fn explain_lists_every_step() {
        let plan = JoinPlanner::default().build_plan(&join_spec().with_limit(1), 2, Some(3));
        let text = plan.explain();
        assert!(text.starts_with("1. scan users-db.users (~2 rows)"));
        assert!(text.contains("2. nested-loop orders-db.orders"));
        assert!(text.contains("3. limit result (~1 rows)"));
        assert!(text.ends_with("strategy=nested-loop cost=6 (primary=2, join=3)"));
        assert_eq!(plan.to_string(), text);
    }
}
