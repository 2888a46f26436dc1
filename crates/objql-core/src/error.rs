//! Core error types.

use std::time::Duration;

use thiserror::Error;

use crate::security::SecurityError;

/// Engine errors.
///
/// Parse, metadata, security, and generation errors are fatal for the call.
/// Driver failures are wrapped into [`Error::Sql`] together with the
/// generated statement and never invalidate caches. Optimizer failures are
/// internal only: the engine falls back to the unoptimized join order.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed DSQL.
    #[error("parse error: {0}")]
    Parse(#[from] objql_lang::ParseError),

    /// Unknown object or unresolved relationship.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Impossible plan; surfaced only through the fallback path's logs.
    #[error("optimizer error: {0}")]
    Optimizer(String),

    /// Driver failure, wrapped with the statement for diagnostics.
    #[error("sql error: {message} (statement: {sql})")]
    Sql {
        /// The driver's message.
        message: String,
        /// The generated SQL that failed.
        sql: String,
    },

    /// Access-control failure.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// The call's deadline elapsed.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The call's cancellation token fired.
    #[error("query was cancelled")]
    Cancelled,

    /// Typed row mapping failure.
    #[error("row mapping error: {0}")]
    Mapping(String),
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(message: impl Into<String>) -> Self {
        Error::Metadata(message.into())
    }

    /// Create a row mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        Error::Mapping(message.into())
    }
}
