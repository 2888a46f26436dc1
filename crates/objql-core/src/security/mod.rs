//! Row-level security.
//!
//! Policies build access predicates from the per-call [`SecurityContext`];
//! the [`RlsEnforcer`] rewrites query filters so every statement only sees
//! rows the context may see, and validates individual records in memory for
//! callers performing DML-style checks.

mod context;
mod enforcer;
mod error;
mod policy;

pub use context::{SecurityContext, ADMIN_ROLE};
pub use enforcer::RlsEnforcer;
pub use error::SecurityError;
pub use policy::{
    AccessMode, AccessPolicy, CustomPolicy, HierarchyPolicy, OwnerPolicy, PolicyKind,
    PolicyRegistry, SharingPolicy, TerritoryPolicy, WILDCARD_OBJECT,
};
