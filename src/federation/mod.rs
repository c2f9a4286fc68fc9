// SPDX-License-Identifier: Apache-2.0

//! Federated Query Engine
//!
//! Queries and joins collections living in several independently owned
//! sources as if they were one store. Fanout merges one collection across
//! sources; the planner picks hash-join or nested-loop from probed row
//! counts; the join executor realizes inner/left/full semantics.

pub mod engine;
pub mod fanout;
pub mod join;
pub mod planner;
pub mod stats;
pub mod types;

pub use engine::FederationEngine;
pub use fanout::FanoutPolicy;
pub use planner::JoinPlanner;
pub use stats::FederationStats;
pub use types::*;
