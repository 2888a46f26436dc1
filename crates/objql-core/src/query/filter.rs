//! In-memory evaluation of filter conditions against rows.
//!
//! Used by RLS record validation and by tests asserting that enforced
//! queries only admit rows the original filter admitted.

use std::cmp::Ordering;

use objql_ir::{CompareOp, Condition, Row, Value};

use crate::error::Error;

/// Evaluates condition trees against in-memory rows.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a condition against a row.
    ///
    /// Missing fields behave like nulls. `InSubquery` leaves evaluate to
    /// false: there is no driver at hand to run the nested query.
    pub fn evaluate(condition: &Condition, row: &Row) -> Result<bool, Error> {
        match condition {
            Condition::Compare { field, op, value } => {
                let Some(actual) = row.get(field).filter(|v| !v.is_null()) else {
                    return Ok(false);
                };
                Ok(Self::compare(actual, *op, value))
            }
            Condition::InList {
                field,
                values,
                negated,
            } => {
                let Some(actual) = row.get(field).filter(|v| !v.is_null()) else {
                    return Ok(false);
                };
                let found = values.iter().any(|v| Self::values_equal(actual, v));
                Ok(found != *negated)
            }
            Condition::InSubquery { .. } => Ok(false),
            Condition::Null { field, negated } => {
                let is_null = row.get(field).map_or(true, Value::is_null);
                Ok(is_null != *negated)
            }
            Condition::Logical { op, left, right } => {
                let l = Self::evaluate(left, row)?;
                match op {
                    objql_ir::LogicalOp::And => {
                        Ok(l && Self::evaluate(right, row)?)
                    }
                    objql_ir::LogicalOp::Or => {
                        Ok(l || Self::evaluate(right, row)?)
                    }
                }
            }
        }
    }

    fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
        match op {
            CompareOp::Eq => Self::values_equal(actual, expected),
            CompareOp::Ne => !Self::values_equal(actual, expected),
            CompareOp::Lt => Self::ordering(actual, expected).is_some_and(Ordering::is_lt),
            CompareOp::Le => Self::ordering(actual, expected).is_some_and(Ordering::is_le),
            CompareOp::Gt => Self::ordering(actual, expected).is_some_and(Ordering::is_gt),
            CompareOp::Ge => Self::ordering(actual, expected).is_some_and(Ordering::is_ge),
            CompareOp::Like => match (actual.as_str(), expected.as_str()) {
                (Some(text), Some(pattern)) => like_match(text, pattern),
                _ => false,
            },
            CompareOp::Contains => match (actual.as_str(), expected.as_str()) {
                (Some(text), Some(needle)) => text.contains(needle),
                _ => false,
            },
            CompareOp::StartsWith => match (actual.as_str(), expected.as_str()) {
                (Some(text), Some(prefix)) => text.starts_with(prefix),
                _ => false,
            },
            CompareOp::EndsWith => match (actual.as_str(), expected.as_str()) {
                (Some(text), Some(suffix)) => text.ends_with(suffix),
                _ => false,
            },
        }
    }

    /// Equality with numeric widening (Int vs Float compare numerically).
    fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64() == b.as_f64()
            }
            _ => a == b,
        }
    }

    fn ordering(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }
}

/// Match a SQL LIKE pattern with `%` and `_` wildcards.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_at(&text, &pattern)
}

fn like_match_at(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => {
            (0..=text.len()).any(|skip| like_match_at(&text[skip..], &pattern[1..]))
        }
        Some('_') => !text.is_empty() && like_match_at(&text[1..], &pattern[1..]),
        Some(ch) => text.first() == Some(ch) && like_match_at(&text[1..], &pattern[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_compare_operators() {
        let r = row(&[("amount", Value::Int(100)), ("name", Value::String("Acme".into()))]);

        assert!(FilterEvaluator::evaluate(&Condition::eq("amount", 100i64), &r).unwrap());
        assert!(FilterEvaluator::evaluate(&Condition::ne("amount", 99i64), &r).unwrap());
        assert!(FilterEvaluator::evaluate(&Condition::gt("amount", 50i64), &r).unwrap());
        assert!(FilterEvaluator::evaluate(&Condition::lt("amount", 200i64), &r).unwrap());
        assert!(!FilterEvaluator::evaluate(&Condition::gt("amount", 100i64), &r).unwrap());
    }

    #[test]
    fn test_numeric_widening() {
        let r = row(&[("amount", Value::Int(100))]);
        assert!(FilterEvaluator::evaluate(&Condition::eq("amount", 100.0f64), &r).unwrap());
        assert!(FilterEvaluator::evaluate(&Condition::gt("amount", 99.5f64), &r).unwrap());
    }

    #[test]
    fn test_missing_field_is_null_like() {
        let r = Row::new();
        assert!(!FilterEvaluator::evaluate(&Condition::eq("x", 1i64), &r).unwrap());
        assert!(FilterEvaluator::evaluate(&Condition::is_null("x"), &r).unwrap());
        assert!(!FilterEvaluator::evaluate(&Condition::is_not_null("x"), &r).unwrap());
    }

    #[test]
    fn test_in_list() {
        let r = row(&[("status", Value::String("open".into()))]);
        let members = vec![Value::String("open".into()), Value::String("held".into())];

        assert!(FilterEvaluator::evaluate(
            &Condition::in_values("status", members.clone()),
            &r
        )
        .unwrap());
        assert!(!FilterEvaluator::evaluate(
            &Condition::not_in_values("status", members),
            &r
        )
        .unwrap());
    }

    #[test]
    fn test_subquery_leaf_never_grants() {
        let r = row(&[("id", Value::String("a".into()))]);
        let cond = Condition::in_subquery("id", objql_ir::Query::select("Share", vec!["record_id"]));
        assert!(!FilterEvaluator::evaluate(&cond, &r).unwrap());
    }

    #[test]
    fn test_like_family() {
        let r = row(&[("name", Value::String("Acme Corp".into()))]);

        let contains = Condition::compare("name", CompareOp::Contains, "cme");
        let starts = Condition::compare("name", CompareOp::StartsWith, "Acme");
        let ends = Condition::compare("name", CompareOp::EndsWith, "Corp");
        let like = Condition::compare("name", CompareOp::Like, "A_me%");

        assert!(FilterEvaluator::evaluate(&contains, &r).unwrap());
        assert!(FilterEvaluator::evaluate(&starts, &r).unwrap());
        assert!(FilterEvaluator::evaluate(&ends, &r).unwrap());
        assert!(FilterEvaluator::evaluate(&like, &r).unwrap());

        let miss = Condition::compare("name", CompareOp::Like, "B%");
        assert!(!FilterEvaluator::evaluate(&miss, &r).unwrap());
    }

    #[test]
    fn test_logical_nodes() {
        let r = row(&[("a", Value::Int(1)), ("b", Value::Int(2))]);

        let both = Condition::and(Condition::eq("a", 1i64), Condition::eq("b", 2i64));
        let either = Condition::or(Condition::eq("a", 9i64), Condition::eq("b", 2i64));
        let neither = Condition::or(Condition::eq("a", 9i64), Condition::eq("b", 9i64));

        assert!(FilterEvaluator::evaluate(&both, &r).unwrap());
        assert!(FilterEvaluator::evaluate(&either, &r).unwrap());
        assert!(!FilterEvaluator::evaluate(&neither, &r).unwrap());
    }

    #[test]
    fn test_like_match_edge_cases() {
        assert!(like_match("", ""));
        assert!(like_match("abc", "%"));
        assert!(like_match("abc", "a%c"));
        assert!(like_match("abc", "___"));
        assert!(!like_match("abc", "__"));
        assert!(like_match("a%b", "a%b"));
    }
}
