//! Cardinality and cost estimation.
//!
//! Selectivities combine multiplicatively under AND and by
//! inclusion-exclusion under OR; per-operator constants follow the planner's
//! calibration and field statistics where available.

use objql_ir::{CompareOp, Condition, Join};

use crate::catalog::{ObjectMetadata, StatisticsProvider};

/// Fallback equality selectivity when a field is unknown to statistics.
const DEFAULT_EQ_SELECTIVITY: f64 = 0.1;

/// Selectivity of range predicates.
const RANGE_SELECTIVITY: f64 = 0.33;

/// Selectivity of subquery membership (cardinality unknown at plan time).
const SUBQUERY_SELECTIVITY: f64 = 0.5;

/// Estimates cardinalities and costs for queries over one base object.
pub struct CostEstimator<'a> {
    object: &'a ObjectMetadata,
    statistics: &'a dyn StatisticsProvider,
}

impl<'a> CostEstimator<'a> {
    /// Create an estimator for the given base object.
    pub fn new(object: &'a ObjectMetadata, statistics: &'a dyn StatisticsProvider) -> Self {
        Self { object, statistics }
    }

    /// Row count of the base object.
    pub fn base_cardinality(&self) -> u64 {
        self.statistics.row_count(&self.object.object_name)
    }

    /// Estimated rows surviving the filter.
    pub fn filtered_cardinality(&self, filter: Option<&Condition>) -> u64 {
        let selectivity = filter.map(|f| self.condition_selectivity(f)).unwrap_or(1.0);
        (self.base_cardinality() as f64 * selectivity).round() as u64
    }

    /// Fraction of rows expected to pass the condition, in `[0, 1]`.
    pub fn condition_selectivity(&self, condition: &Condition) -> f64 {
        match condition {
            Condition::Compare { field, op, .. } => match op {
                CompareOp::Eq => self.field_selectivity(field),
                CompareOp::Ne => 1.0 - self.field_selectivity(field),
                CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                    RANGE_SELECTIVITY
                }
                CompareOp::Like => 0.1,
                CompareOp::Contains => 0.05,
                CompareOp::StartsWith | CompareOp::EndsWith => 0.1,
            },
            Condition::InList {
                field,
                values,
                negated,
            } => {
                let hit = (values.len() as f64 * self.field_selectivity(field)).min(0.5);
                if *negated {
                    1.0 - hit
                } else {
                    hit
                }
            }
            Condition::InSubquery { negated, .. } => {
                if *negated {
                    1.0 - SUBQUERY_SELECTIVITY
                } else {
                    SUBQUERY_SELECTIVITY
                }
            }
            Condition::Null { field, negated } => {
                let nullable = self
                    .object
                    .field(field)
                    .map(|f| f.nullable)
                    .unwrap_or(true);
                match (nullable, negated) {
                    (true, false) => 0.1,
                    (false, false) => 0.0,
                    (true, true) => 0.9,
                    (false, true) => 1.0,
                }
            }
            Condition::Logical { op, left, right } => {
                let l = self.condition_selectivity(left);
                let r = self.condition_selectivity(right);
                match op {
                    objql_ir::LogicalOp::And => l * r,
                    objql_ir::LogicalOp::Or => l + r - l * r,
                }
            }
        }
    }

    /// Total cost estimate for a plan shape: base scan, filter evaluation,
    /// joins in order, sort, and aggregation.
    pub fn total_cost(
        &self,
        filter: Option<&Condition>,
        join_order: &[Join],
        has_order: bool,
        is_aggregate: bool,
    ) -> f64 {
        let base = self.base_cardinality() as f64;
        let filtered = self.filtered_cardinality(filter) as f64;

        let mut cost = base * 0.1;
        if filter.is_some() {
            cost += base * 0.05;
        }

        let mut cardinality = filtered;
        for join in join_order {
            cost += join_cost(cardinality, join);
            cardinality *= join.selectivity;
        }

        if has_order && filtered > 0.0 {
            cost += filtered * filtered.log2().max(0.0);
        }
        if is_aggregate {
            cost += 0.1 * filtered;
        }
        cost
    }

    fn field_selectivity(&self, field: &str) -> f64 {
        self.statistics
            .field_selectivity(&self.object.object_name, field)
            .unwrap_or(DEFAULT_EQ_SELECTIVITY)
    }
}

/// Cost of joining `left_cardinality` rows against a join target.
///
/// `min(L·R, L+R)` picks nested-loop or hash build, whichever is cheaper;
/// the additive term models emitting matched rows.
pub fn join_cost(left_cardinality: f64, join: &Join) -> f64 {
    let rows = join.estimated_rows as f64;
    (left_cardinality * rows).min(left_cardinality + rows)
        + left_cardinality * rows * join.selectivity
}
