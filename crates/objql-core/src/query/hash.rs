//! Stable content hashing of query shapes.
//!
//! The hash is a SHA-256 digest over a deterministic canonical rendering of
//! the query tree, so it survives process restarts and is insensitive to
//! whitespace in the original DSQL. When RLS is enabled the current user id
//! and sorted roles are mixed in, keeping cached artifacts per-identity.
//! `IN`-list values are sorted before hashing so permutations of the same
//! list share an entry.

use std::fmt;
use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use objql_ir::{Condition, Query, SelectItem, Value};

use crate::security::SecurityContext;

/// A stable query-shape hash, usable as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryHash(String);

impl QueryHash {
    /// Compute the hash of a query, mixing in the security identity when
    /// provided.
    pub fn compute(query: &Query, security: Option<&SecurityContext>) -> Self {
        let mut canonical = String::new();
        write_query(&mut canonical, query);
        if let Some(context) = security {
            let _ = write!(canonical, "|user={}", context.user_id);
            let _ = write!(canonical, "|roles={}", context.sorted_roles().join(","));
        }

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for byte in digest {
            let _ = write!(hex, "{:02x}", byte);
        }
        Self(hex)
    }

    /// Short identifier of a query shape (no security inputs), used as the
    /// plan id.
    pub fn shape_id(query: &Query) -> String {
        let full = Self::compute(query, None);
        full.0[..16].to_string()
    }
}

impl fmt::Display for QueryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_query(out: &mut String, query: &Query) {
    let _ = write!(out, "from:{}|select:", query.from_object);
    for item in &query.select {
        match item {
            SelectItem::Field { name, alias } => {
                let _ = write!(out, "f({},{});", name, alias.as_deref().unwrap_or(""));
            }
            SelectItem::Aggregate {
                function,
                field,
                alias,
            } => {
                let _ = write!(
                    out,
                    "a({:?},{},{});",
                    function,
                    field.as_deref().unwrap_or("*"),
                    alias.as_deref().unwrap_or("")
                );
            }
            SelectItem::Subquery { query, alias } => {
                out.push_str("q(");
                write_query(out, query);
                let _ = write!(out, ",{});", alias.as_deref().unwrap_or(""));
            }
        }
    }
    out.push_str("|where:");
    if let Some(filter) = &query.filter {
        write_condition(out, filter);
    }
    out.push_str("|order:");
    for order in &query.order_by {
        let _ = write!(out, "{},{:?},{:?};", order.field, order.direction, order.nulls);
    }
    out.push_str("|group:");
    for field in &query.group_by {
        let _ = write!(out, "{};", field);
    }
    out.push_str("|having:");
    if let Some(having) = &query.having {
        write_condition(out, having);
    }
    let _ = write!(
        out,
        "|limit:{}|offset:{}",
        query.limit.map(|n| n.to_string()).unwrap_or_default(),
        query.offset.map(|n| n.to_string()).unwrap_or_default()
    );
}

fn write_condition(out: &mut String, condition: &Condition) {
    match condition {
        Condition::Compare { field, op, value } => {
            let _ = write!(out, "cmp({},{:?},", field, op);
            write_value(out, value);
            out.push(')');
        }
        Condition::InList {
            field,
            values,
            negated,
        } => {
            let _ = write!(out, "in({},{},[", field, negated);
            let mut rendered: Vec<String> = values
                .iter()
                .map(|v| {
                    let mut s = String::new();
                    write_value(&mut s, v);
                    s
                })
                .collect();
            rendered.sort_unstable();
            out.push_str(&rendered.join(","));
            out.push_str("])");
        }
        Condition::InSubquery {
            field,
            query,
            negated,
        } => {
            let _ = write!(out, "insub({},{},(", field, negated);
            write_query(out, query);
            out.push_str("))");
        }
        Condition::Null { field, negated } => {
            let _ = write!(out, "null({},{})", field, negated);
        }
        Condition::Logical { op, left, right } => {
            let _ = write!(out, "{:?}(", op);
            write_condition(out, left);
            out.push(',');
            write_condition(out, right);
            out.push(')');
        }
    }
}

/// Type-tagged value rendering so e.g. `Int(1)` and `String("1")` differ.
fn write_value(out: &mut String, value: &Value) {
    let _ = match value {
        Value::Null => write!(out, "n:"),
        Value::Bool(b) => write!(out, "b:{}", b),
        Value::Int(i) => write!(out, "i:{}", i),
        Value::Float(f) => write!(out, "d:{}", f),
        Value::String(s) => write!(out, "s:{}", s),
        Value::Date(d) => write!(out, "t:{}", d),
    };
}
