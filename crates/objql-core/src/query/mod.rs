//! Query pipeline: join resolution, optimization, caching, and execution.

mod cost;
mod executor;
mod filter;
mod hash;
mod optimizer;
mod plan_cache;
mod resolve;
mod result_cache;

pub use cost::{join_cost, CostEstimator};
pub use executor::QueryExecutor;
pub use filter::FilterEvaluator;
pub use hash::QueryHash;
pub use optimizer::{IndexCandidate, Optimizer, Plan};
pub use plan_cache::{PlanCache, PlanCacheStatistics, TopPlan};
pub use resolve::resolve_joins;
pub use result_cache::{ResultCache, ResultCacheStatistics};
