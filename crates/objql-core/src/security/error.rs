//! Security error types.

use thiserror::Error;

/// Errors raised by access-control machinery.
#[derive(Debug, Clone, Error)]
pub enum SecurityError {
    /// No policy granted access to a record.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A policy could not build its predicate for the given context.
    #[error("policy error: {0}")]
    PolicyError(String),
}
