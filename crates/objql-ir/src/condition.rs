//! Filter condition trees.
//!
//! A condition is either a leaf predicate over a single field or an internal
//! AND/OR node over two sub-conditions. Subqueries inside `IN`/`NOT IN`
//! leaves own their nested [`Query`].

use serde::{Deserialize, Serialize};

use crate::query::Query;
use crate::value::Value;

/// Comparison operators for leaf predicates.
///
/// `Contains`, `StartsWith`, and `EndsWith` are synthesized by the parser
/// from `LIKE` patterns whose `%` placement matches; their values carry the
/// pattern with the wildcards stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Raw LIKE pattern match.
    Like,
    /// Substring match (`%x%`).
    Contains,
    /// Prefix match (`x%`).
    StartsWith,
    /// Suffix match (`%x`).
    EndsWith,
}

impl CompareOp {
    /// Check if this is one of the LIKE-family operators.
    pub fn is_like_family(&self) -> bool {
        matches!(
            self,
            CompareOp::Like | CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }
}

/// Logical combinators for internal nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Both sides must hold.
    And,
    /// Either side must hold.
    Or,
}

/// A filter condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// A single-field comparison against a literal value.
    Compare {
        /// Field name (may be dotted, may be an aggregate call in HAVING).
        field: String,
        /// Comparison operator.
        op: CompareOp,
        /// Literal right-hand side.
        value: Value,
    },
    /// Membership in a literal list.
    InList {
        /// Field name.
        field: String,
        /// The candidate values.
        values: Vec<Value>,
        /// True for `NOT IN`.
        negated: bool,
    },
    /// Membership in a subquery result.
    InSubquery {
        /// Field name.
        field: String,
        /// The nested query producing candidate values.
        query: Box<Query>,
        /// True for `NOT IN`.
        negated: bool,
    },
    /// Null check.
    Null {
        /// Field name.
        field: String,
        /// True for `IS NOT NULL`.
        negated: bool,
    },
    /// Internal AND/OR node.
    Logical {
        /// The combinator.
        op: LogicalOp,
        /// Left sub-condition.
        left: Box<Condition>,
        /// Right sub-condition.
        right: Box<Condition>,
    },
}

impl Condition {
    /// Create an equality comparison.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    /// Create an inequality comparison.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op: CompareOp::Ne,
            value: value.into(),
        }
    }

    /// Create a less-than comparison.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op: CompareOp::Lt,
            value: value.into(),
        }
    }

    /// Create a greater-than comparison.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op: CompareOp::Gt,
            value: value.into(),
        }
    }

    /// Create a comparison with an explicit operator.
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Create an `IN` list membership check.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::InList {
            field: field.into(),
            values,
            negated: false,
        }
    }

    /// Create a `NOT IN` list membership check.
    pub fn not_in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::InList {
            field: field.into(),
            values,
            negated: true,
        }
    }

    /// Create an `IN (SELECT …)` membership check.
    pub fn in_subquery(field: impl Into<String>, query: Query) -> Self {
        Condition::InSubquery {
            field: field.into(),
            query: Box::new(query),
            negated: false,
        }
    }

    /// Create an `IS NULL` check.
    pub fn is_null(field: impl Into<String>) -> Self {
        Condition::Null {
            field: field.into(),
            negated: false,
        }
    }

    /// Create an `IS NOT NULL` check.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Condition::Null {
            field: field.into(),
            negated: true,
        }
    }

    /// Combine two conditions with AND.
    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Combine two conditions with OR.
    pub fn or(left: Condition, right: Condition) -> Self {
        Condition::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// OR-fold a non-empty list of conditions.
    ///
    /// Returns `None` for an empty input.
    pub fn any_of(conditions: Vec<Condition>) -> Option<Condition> {
        conditions.into_iter().reduce(Condition::or)
    }

    /// Collect every field name referenced by this tree (subqueries excluded).
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Compare { field, .. }
            | Condition::InList { field, .. }
            | Condition::InSubquery { field, .. }
            | Condition::Null { field, .. } => out.push(field),
            Condition::Logical { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
        }
    }

    /// Collect every object name referenced by subqueries in this tree.
    pub fn collect_objects(&self, out: &mut Vec<String>) {
        match self {
            Condition::InSubquery { query, .. } => query.collect_objects(out),
            Condition::Logical { left, right, .. } => {
                left.collect_objects(out);
                right.collect_objects(out);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    #[test]
    fn test_constructors() {
        let c = Condition::eq("name", "Acme");
        match c {
            Condition::Compare { field, op, value } => {
                assert_eq!(field, "name");
                assert_eq!(op, CompareOp::Eq);
                assert_eq!(value, Value::String("Acme".into()));
            }
            _ => panic!("expected Compare"),
        }
    }

    #[test]
    fn test_any_of() {
        assert_eq!(Condition::any_of(vec![]), None);

        let single = Condition::any_of(vec![Condition::eq("a", 1i64)]).unwrap();
        assert!(matches!(single, Condition::Compare { .. }));

        let pair = Condition::any_of(vec![
            Condition::eq("a", 1i64),
            Condition::eq("b", 2i64),
        ])
        .unwrap();
        match pair {
            Condition::Logical { op, .. } => assert_eq!(op, LogicalOp::Or),
            _ => panic!("expected Logical"),
        }
    }

    #[test]
    fn test_referenced_fields() {
        let c = Condition::and(
            Condition::eq("status", "open"),
            Condition::or(Condition::gt("amount", 10i64), Condition::is_null("owner_id")),
        );
        let fields = c.referenced_fields();
        assert_eq!(fields, vec!["status", "amount", "owner_id"]);
    }

    #[test]
    fn test_collect_objects_from_subquery() {
        let sub = Query::select("Share", vec!["record_id"]);
        let c = Condition::in_subquery("id", sub);
        let mut objects = Vec::new();
        c.collect_objects(&mut objects);
        assert_eq!(objects, vec!["Share"]);
    }

    #[test]
    fn test_like_family() {
        assert!(CompareOp::Contains.is_like_family());
        assert!(CompareOp::Like.is_like_family());
        assert!(!CompareOp::Eq.is_like_family());
    }
}
