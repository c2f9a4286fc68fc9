// Pocket Federation - query and join across local and remote document sources
// Core library

pub mod config;
pub mod federation;
pub mod observability;
pub mod registry;
pub mod timeout;

pub use config::FederationConfig;
pub use federation::{
    FanoutPolicy, FanoutRequest, FanoutResult, FederatedQueryResult, FederatedQuerySpec,
    FederatedRow, FederationEngine, FederationStats, JoinClause, JoinStrategy, JoinType,
    PlanOperation, PlanStep, QueryPlan,
};
pub use registry::{DataSource, SourceLocation, SourceRegistry};
pub use timeout::TimeoutExecutor;

pub use pocket_core::{
    Document, ExecutorError, ExecutorResult, FederationError, FederationResult, Filter,
    MemorySource, QueryExecutor,
};
