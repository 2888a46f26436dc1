//! OBJQL intermediate representation.
//!
//! This crate defines the query tree that flows through the OBJQL pipeline:
//! the parser produces a [`Query`], the RLS enforcer rewrites its filter, and
//! the optimizer and SQL generator consume it read-only. It also defines the
//! runtime [`Value`] type used for literals, bind parameters, and result rows.

mod condition;
mod query;
mod value;

pub use condition::{CompareOp, Condition, LogicalOp};
pub use query::{
    AggregateFunction, Join, JoinType, NullsOrder, OrderSpec, Query, SelectItem, SortDirection,
};
pub use value::{Row, Value};
