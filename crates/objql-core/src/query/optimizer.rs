//! Cost-based optimization: cardinality estimation, join reordering, index
//! selection, and execution-strategy flags.

use std::fmt::Write as _;

use tracing::warn;

use objql_ir::{Join, Query};

use crate::catalog::{MetadataProvider, StatisticsProvider};
use crate::error::Error;

use super::cost::{join_cost, CostEstimator};
use super::hash::QueryHash;

/// Joins at or below this count are reordered exhaustively via subset DP.
const DP_JOIN_LIMIT: usize = 6;

/// Parallel loading kicks in above this filtered cardinality.
const PARALLEL_ROW_THRESHOLD: u64 = 10_000;

/// Streaming kicks in above this filtered cardinality.
const STREAMING_ROW_THRESHOLD: u64 = 1_000;

/// Upper bound on the parallel degree regardless of core count.
const PARALLEL_DEGREE_CAP: usize = 4;

/// How many index candidates a plan keeps.
const INDEX_CANDIDATE_LIMIT: usize = 3;

/// An index the plan recommends using.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexCandidate {
    /// Indexed field name.
    pub field: String,
    /// Discrimination score (`1 / (selectivity + 0.01)`).
    pub score: f64,
}

/// An optimized, generator-ready query plan.
#[derive(Debug, Clone)]
pub struct Plan {
    /// The (possibly RLS-rewritten) query.
    pub query: Query,
    /// Base object row count.
    pub base_cardinality: u64,
    /// Estimated rows surviving the filter.
    pub filtered_cardinality: u64,
    /// Joins in execution order.
    pub join_order: Vec<Join>,
    /// Most discriminating usable indexes.
    pub selected_indexes: Vec<IndexCandidate>,
    /// Fetch relationships concurrently.
    pub use_parallel: bool,
    /// Concurrency bound for parallel fetches.
    pub parallel_degree: usize,
    /// Aggregate via hash table.
    pub use_hash_aggregation: bool,
    /// Stream rows instead of buffering.
    pub use_streaming: bool,
    /// Total cost estimate for telemetry and cache comparisons.
    pub estimated_cost: f64,
    /// Stable hash of the normalized query shape.
    pub plan_id: String,
}

impl Plan {
    /// Render a human-readable summary of the plan.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "plan {}", self.plan_id);
        let _ = writeln!(
            out,
            "  scan {} (rows={}, filtered={})",
            self.query.from_object, self.base_cardinality, self.filtered_cardinality
        );
        for (i, join) in self.join_order.iter().enumerate() {
            let _ = writeln!(
                out,
                "  join t{} {} -> {} (rows={}, selectivity={})",
                i + 1,
                join.relationship,
                join.target_object,
                join.estimated_rows,
                join.selectivity
            );
        }
        for index in &self.selected_indexes {
            let _ = writeln!(out, "  index {} (score={:.1})", index.field, index.score);
        }
        let _ = writeln!(
            out,
            "  parallel={} degree={} hash_agg={} streaming={} cost={:.1}",
            self.use_parallel,
            self.parallel_degree,
            self.use_hash_aggregation,
            self.use_streaming,
            self.estimated_cost
        );
        out
    }
}

/// The query optimizer.
///
/// Pure and deterministic given the same metadata and statistics snapshot.
pub struct Optimizer<'a> {
    metadata: &'a dyn MetadataProvider,
    statistics: &'a dyn StatisticsProvider,
}

impl<'a> Optimizer<'a> {
    /// Create an optimizer over the given providers.
    pub fn new(metadata: &'a dyn MetadataProvider, statistics: &'a dyn StatisticsProvider) -> Self {
        Self {
            metadata,
            statistics,
        }
    }

    /// Produce a plan for the query.
    pub fn optimize(&self, query: Query) -> Result<Plan, Error> {
        let object = self.metadata.object(&query.from_object)?;
        let estimator = CostEstimator::new(&object, self.statistics);

        let base_cardinality = estimator.base_cardinality();
        let filtered_cardinality = estimator.filtered_cardinality(query.filter.as_ref());

        let join_order = match reorder_joins(&query.joins, filtered_cardinality) {
            Ok(order) => order,
            Err(Error::Optimizer(reason)) => {
                // Impossible plan inputs are non-fatal: keep textual order.
                warn!(%reason, "join reordering failed, keeping textual join order");
                query.joins.clone()
            }
            Err(other) => return Err(other),
        };

        let selected_indexes = select_indexes(&query, &object);

        let use_parallel =
            join_order.len() >= 2 && filtered_cardinality > PARALLEL_ROW_THRESHOLD;
        let parallel_degree = PARALLEL_DEGREE_CAP.min(available_cores());
        let use_hash_aggregation = !query.group_by.is_empty();
        let use_streaming =
            filtered_cardinality > STREAMING_ROW_THRESHOLD && !query.is_aggregate();

        let estimated_cost = estimator.total_cost(
            query.filter.as_ref(),
            &join_order,
            !query.order_by.is_empty(),
            query.is_aggregate(),
        );
        let plan_id = QueryHash::shape_id(&query);

        Ok(Plan {
            query,
            base_cardinality,
            filtered_cardinality,
            join_order,
            selected_indexes,
            use_parallel,
            parallel_degree,
            use_hash_aggregation,
            use_streaming,
            estimated_cost,
            plan_id,
        })
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

/// Reorder joins to minimize cumulative join cost.
///
/// Up to [`DP_JOIN_LIMIT`] joins use exact dynamic programming over subset
/// bitmasks; beyond that a greedy pass picks the cheapest next join.
fn reorder_joins(joins: &[Join], base_cardinality: u64) -> Result<Vec<Join>, Error> {
    if joins.len() <= 1 {
        return Ok(joins.to_vec());
    }
    if let Some(join) = joins.iter().find(|j| j.estimated_rows == 0) {
        return Err(Error::Optimizer(format!(
            "join target '{}' has no cardinality estimate",
            join.target_object
        )));
    }

    let order = if joins.len() <= DP_JOIN_LIMIT {
        reorder_joins_dp(joins, base_cardinality as f64)
    } else {
        reorder_joins_greedy(joins, base_cardinality as f64)
    };
    Ok(order.into_iter().map(|i| joins[i].clone()).collect())
}

fn reorder_joins_dp(joins: &[Join], base_cardinality: f64) -> Vec<usize> {
    let n = joins.len();
    let full = (1usize << n) - 1;

    // Cardinality after a subset is order-independent: base * prod(sel).
    let mut cardinality = vec![base_cardinality; full + 1];
    for mask in 1..=full {
        let j = mask.trailing_zeros() as usize;
        cardinality[mask] = cardinality[mask & !(1 << j)] * joins[j].selectivity;
    }

    let mut best_cost = vec![f64::INFINITY; full + 1];
    let mut best_last: Vec<Option<usize>> = vec![None; full + 1];
    best_cost[0] = 0.0;

    for mask in 1..=full {
        for j in 0..n {
            if mask & (1 << j) == 0 {
                continue;
            }
            let prev = mask & !(1 << j);
            if best_cost[prev].is_infinite() {
                continue;
            }
            let cost = best_cost[prev] + join_cost(cardinality[prev], &joins[j]);
            if cost < best_cost[mask] {
                best_cost[mask] = cost;
                best_last[mask] = Some(j);
            }
        }
    }

    let mut order = Vec::with_capacity(n);
    let mut mask = full;
    while mask != 0 {
        let j = best_last[mask].expect("dp table covers all non-empty subsets");
        order.push(j);
        mask &= !(1 << j);
    }
    order.reverse();
    order
}

fn reorder_joins_greedy(joins: &[Join], base_cardinality: f64) -> Vec<usize> {
    let n = joins.len();
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut order = Vec::with_capacity(n);
    let mut cardinality = base_cardinality;

    while !remaining.is_empty() {
        let (pos, &j) = remaining
            .iter()
            .enumerate()
            .min_by(|(_, &a), (_, &b)| {
                join_cost(cardinality, &joins[a])
                    .total_cmp(&join_cost(cardinality, &joins[b]))
            })
            .expect("remaining is non-empty");
        order.push(j);
        cardinality *= joins[j].selectivity;
        remaining.remove(pos);
    }
    order
}

/// Walk the filter collecting indexed fields, scored by discrimination.
fn select_indexes(query: &Query, object: &crate::catalog::ObjectMetadata) -> Vec<IndexCandidate> {
    let Some(filter) = &query.filter else {
        return Vec::new();
    };

    let mut candidates: Vec<IndexCandidate> = Vec::new();
    for field in filter.referenced_fields() {
        let Some(meta) = object.field(field) else {
            continue;
        };
        if !meta.indexed {
            continue;
        }
        let score = 1.0 / (meta.selectivity + 0.01);
        match candidates.iter_mut().find(|c| c.field == field) {
            Some(existing) => existing.score = existing.score.max(score),
            None => candidates.push(IndexCandidate {
                field: field.to_string(),
                score,
            }),
        }
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(INDEX_CANDIDATE_LIMIT);
    candidates
}
