//! The query tree produced by the parser and consumed by the pipeline.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Aggregate function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// Count of rows or of non-null values.
    Count,
    /// Count of distinct values.
    CountDistinct,
    /// Sum of numeric values.
    Sum,
    /// Average of numeric values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
}

impl AggregateFunction {
    /// The SQL function name (`COUNT_DISTINCT` renders as `COUNT(DISTINCT …)`).
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count | AggregateFunction::CountDistinct => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    /// Look up a function by its DSQL name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "AVG" => Some(AggregateFunction::Avg),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            _ => None,
        }
    }
}

/// One item of a SELECT list.
///
/// The three cases are mutually exclusive: a plain (possibly dotted) field
/// reference, an aggregate call, or a nested subquery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    /// A plain or dotted field reference.
    Field {
        /// Field name; a dotted name's leading segment names a relationship.
        name: String,
        /// Optional alias.
        alias: Option<String>,
    },
    /// An aggregate call.
    Aggregate {
        /// The aggregate function.
        function: AggregateFunction,
        /// Field argument (`None` for `COUNT(*)`).
        field: Option<String>,
        /// Optional alias.
        alias: Option<String>,
    },
    /// A nested query in the select list.
    Subquery {
        /// The nested query.
        query: Box<Query>,
        /// Optional alias.
        alias: Option<String>,
    },
}

impl SelectItem {
    /// Create a plain field item.
    pub fn field(name: impl Into<String>) -> Self {
        SelectItem::Field {
            name: name.into(),
            alias: None,
        }
    }

    /// Create an aggregate item.
    pub fn aggregate(function: AggregateFunction, field: Option<String>) -> Self {
        SelectItem::Aggregate {
            function,
            field,
            alias: None,
        }
    }

    /// The relationship prefix of a dotted field reference, if any.
    pub fn relationship_prefix(&self) -> Option<&str> {
        match self {
            SelectItem::Field { name, .. } => name.split_once('.').map(|(rel, _)| rel),
            _ => None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Null placement in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// Nulls sort before all values.
    First,
    /// Nulls sort after all values.
    Last,
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by (may be dotted).
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
    /// Null placement.
    pub nulls: NullsOrder,
}

impl OrderSpec {
    /// Create an ordering with the defaults `ASC NULLS LAST`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
            nulls: NullsOrder::Last,
        }
    }

    /// Create a descending ordering with `NULLS LAST`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
            nulls: NullsOrder::Last,
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// Inner join.
    Inner,
    /// Left outer join.
    Left,
    /// Right outer join.
    Right,
}

/// A join derived from a dotted field reference.
///
/// Joins are deduplicated by `relationship`; `estimated_rows` and
/// `selectivity` are annotated from statistics during resolution and drive
/// the optimizer's reordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Relationship name on the base object.
    pub relationship: String,
    /// Target object name.
    pub target_object: String,
    /// Foreign-key field on the base object.
    pub foreign_key: String,
    /// Referenced key field on the target object.
    pub primary_key: String,
    /// Join type.
    pub join_type: JoinType,
    /// Estimated row count of the target object.
    pub estimated_rows: u64,
    /// Estimated join selectivity in `[0, 1]`.
    pub selectivity: f64,
}

/// A parsed DSQL query.
///
/// Created by the parser, rewritten only by the RLS enforcer, then immutable
/// through optimization and generation. `select` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Logical object being queried.
    pub from_object: String,
    /// SELECT list (non-empty).
    pub select: Vec<SelectItem>,
    /// WHERE condition.
    pub filter: Option<Condition>,
    /// ORDER BY items.
    pub order_by: Vec<OrderSpec>,
    /// GROUP BY field names.
    pub group_by: Vec<String>,
    /// HAVING condition.
    pub having: Option<Condition>,
    /// Row limit.
    pub limit: Option<u64>,
    /// Row offset.
    pub offset: Option<u64>,
    /// Joins derived from dotted field references.
    pub joins: Vec<Join>,
}

impl Query {
    /// Create a query selecting the given plain fields.
    pub fn select(from_object: impl Into<String>, fields: Vec<&str>) -> Self {
        Self {
            from_object: from_object.into(),
            select: fields.into_iter().map(SelectItem::field).collect(),
            filter: None,
            order_by: Vec::new(),
            group_by: Vec::new(),
            having: None,
            limit: None,
            offset: None,
            joins: Vec::new(),
        }
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: Condition) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add an ordering.
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Check if any select item is an aggregate.
    pub fn is_aggregate(&self) -> bool {
        self.select
            .iter()
            .any(|item| matches!(item, SelectItem::Aggregate { .. }))
    }

    /// Collect every object name this query touches: the base object, join
    /// targets, and the objects of nested subqueries.
    pub fn referenced_objects(&self) -> Vec<String> {
        let mut objects = Vec::new();
        self.collect_objects(&mut objects);
        objects.dedup();
        objects
    }

    pub(crate) fn collect_objects(&self, out: &mut Vec<String>) {
        out.push(self.from_object.clone());
        for join in &self.joins {
            out.push(join.target_object.clone());
        }
        for item in &self.select {
            if let SelectItem::Subquery { query, .. } = item {
                query.collect_objects(out);
            }
        }
        if let Some(filter) = &self.filter {
            filter.collect_objects(out);
        }
        if let Some(having) = &self.having {
            having.collect_objects(out);
        }
    }
}
