// SPDX-License-Identifier: Apache-2.0

//! Planner statistics
//!
//! In-memory counters owned by an engine instance. Nothing is persisted;
//! values live until `reset` or the engine is dropped.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::types::JoinStrategy;

#[derive(Debug, Default)]
struct Counters {
    total_plans: u64,
    hash_join_count: u64,
    nested_loop_count: u64,
    no_join_count: u64,
    total_executions: u64,
    /// Most recent planning durations, oldest first.
    plan_times_ms: VecDeque<f64>,
    last_planned_at: Option<DateTime<Utc>>,
}

/// Snapshot returned by `FederationEngine::get_stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationStats {
    pub total_plans: u64,
    pub hash_join_count: u64,
    pub nested_loop_count: u64,
    pub no_join_count: u64,
    pub total_executions: u64,
    /// Mean over the rolling window; 0 before the first plan.
    pub avg_plan_time_ms: f64,
    pub last_planned_at: Option<DateTime<Utc>>,
}

pub struct StatsCollector {
    counters: Mutex<Counters>,
    capacity: usize,
}

impl StatsCollector {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            counters: Mutex::new(Counters {
                plan_times_ms: VecDeque::with_capacity(capacity),
                ..Counters::default()
            }),
            capacity,
        }
    }

    pub fn record_plan(&self, strategy: JoinStrategy, planning_time_ms: f64) {
        let mut counters = self.counters.lock();
        counters.total_plans += 1;
        match strategy {
            JoinStrategy::HashJoin => counters.hash_join_count += 1,
            JoinStrategy::NestedLoop => counters.nested_loop_count += 1,
            JoinStrategy::NoJoin => counters.no_join_count += 1,
        }

        if counters.plan_times_ms.len() >= self.capacity {
            counters.plan_times_ms.pop_front();
        }
        counters.plan_times_ms.push_back(planning_time_ms.max(0.0));
        counters.last_planned_at = Some(Utc::now());
    }

    pub fn record_execution(&self) {
        self.counters.lock().total_executions += 1;
    }

    pub fn snapshot(&self) -> FederationStats {
        let counters = self.counters.lock();
        let window = &counters.plan_times_ms;
        let avg_plan_time_ms = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f64>() / window.len() as f64
        };

        FederationStats {
            total_plans: counters.total_plans,
            hash_join_count: counters.hash_join_count,
            nested_loop_count: counters.nested_loop_count,
            no_join_count: counters.no_join_count,
            total_executions: counters.total_executions,
            avg_plan_time_ms,
            last_planned_at: counters.last_planned_at,
        }
    }

    pub fn reset(&self) {
        let mut counters = self.counters.lock();
        *counters = Counters {
            plan_times_ms: VecDeque::with_capacity(self.capacity),
            ..Counters::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_strategies() {
        let stats = StatsCollector::new(100);
        stats.record_plan(JoinStrategy::HashJoin, 2.0);
        stats.record_plan(JoinStrategy::NestedLoop, 4.0);
        stats.record_plan(JoinStrategy::NestedLoop, 6.0);
        stats.record_plan(JoinStrategy::NoJoin, 0.0);
        stats.record_execution();

        let s = stats.snapshot();
        assert_eq!(s.total_plans, 4);
        assert_eq!(s.hash_join_count, 1);
        assert_eq!(s.nested_loop_count, 2);
        assert_eq!(s.no_join_count, 1);
        assert_eq!(s.total_executions, 1);
        assert_eq!(s.avg_plan_time_ms, 3.0);
        assert!(s.last_planned_at.is_some());
    }

    #[test]
    fn average_covers_only_the_window() {
        let stats = StatsCollector::new(2);
        stats.record_plan(JoinStrategy::NoJoin, 100.0);
        stats.record_plan(JoinStrategy::NoJoin, 2.0);
        stats.record_plan(JoinStrategy::NoJoin, 4.0);

        let s = stats.snapshot();
        assert_eq!(s.total_plans, 3);
        assert_eq!(s.avg_plan_time_ms, 3.0);
    }

    #[test]
    fn empty_and_reset() {
        let stats = StatsCollector::new(0);
        assert_eq!(stats.snapshot().avg_plan_time_ms, 0.0);

        stats.record_plan(JoinStrategy::HashJoin, 1.0);
        stats.reset();
        let s = stats.snapshot();
        assert_eq!(s.total_plans, 0);
        assert_eq!(s.hash_join_count, 0);
        assert!(s.last_planned_at.is_none());
    }
}
